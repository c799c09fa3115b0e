//! Filtering algorithms for range readings

/// A generic filter interface
pub trait Filter<T> {
    type Output;

    /// Filter the input data
    fn filter(&self, input: T) -> Self::Output;
}

/// Median of a batch of raw readings; suppresses single ultrasonic spikes
#[derive(Debug, Default, Clone, Copy)]
pub struct MedianFilter;

impl MedianFilter {
    pub fn new() -> Self {
        MedianFilter
    }
}

impl<'a> Filter<&'a [u32]> for MedianFilter {
    type Output = Option<f64>;

    fn filter(&self, input: &'a [u32]) -> Option<f64> {
        if input.is_empty() {
            return None;
        }

        let mut sorted = input.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid] as f64)
        } else {
            Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
        }
    }
}

/// Range correction derived from field tests of the ultrasonic sensor
pub fn field_error_correction(raw: f64) -> f64 {
    (raw + 2.5) / 1.32
}
