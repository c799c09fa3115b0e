//! Heading estimator: probability mass over robot-relative wall directions

use crate::common::angles::normalize;
use crate::common::types::Degrees;
use crate::hardware::RandomSource;
use nalgebra::DVector;

/// Width of one heading bin
pub const BIN_WIDTH: Degrees = 10.0;

/// Mass given to the observed bin by a perpendicular detection
const PEAK_MASS: f64 = 0.6;

/// Mass given to each neighbour of the observed bin
const NEIGHBOUR_MASS: f64 = 0.2;

/// Discretized probability mass over robot-relative directions.
///
/// Bin `k` covers direction `k * bin_width`, clockwise from straight ahead.
/// Masses are non-negative but need not sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingDistribution {
    masses: DVector<f64>,
    bin_width: Degrees,
}

impl HeadingDistribution {
    /// Uniform distribution over `bins` bins of `bin_width` degrees
    pub fn uniform(bins: usize, bin_width: Degrees) -> Self {
        let bins = bins.max(1);
        HeadingDistribution {
            masses: DVector::from_element(bins, 1.0 / bins as f64),
            bin_width,
        }
    }

    /// 36 bins covering the full circle
    pub fn full_circle() -> Self {
        Self::uniform(36, BIN_WIDTH)
    }

    /// 18 bins covering a half circle
    pub fn half_circle() -> Self {
        Self::uniform(18, BIN_WIDTH)
    }

    /// Forget everything and return to uniform
    pub fn reset(&mut self) {
        let bins = self.len();
        self.masses.fill(1.0 / bins as f64);
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn bin_width(&self) -> Degrees {
        self.bin_width
    }

    pub fn masses(&self) -> &DVector<f64> {
        &self.masses
    }

    pub fn mass(&self, bin: usize) -> f64 {
        self.masses[bin % self.len()]
    }

    pub fn total(&self) -> f64 {
        self.masses.sum()
    }

    /// Bin containing a direction
    pub fn bin_of(&self, angle: Degrees) -> usize {
        let bin = (normalize(angle) / self.bin_width).round() as usize;
        bin % self.len()
    }

    /// Direction at the center of a bin
    pub fn angle_of(&self, bin: usize) -> Degrees {
        (bin % self.len()) as f64 * self.bin_width
    }

    /// Replace the distribution with a peak at the bin of `angle`
    pub fn observe_perpendicular(&mut self, angle: Degrees) {
        let n = self.len();
        let bin = self.bin_of(angle);
        self.masses.fill(0.0);
        self.masses[(bin + n - 1) % n] += NEIGHBOUR_MASS;
        self.masses[(bin + 1) % n] += NEIGHBOUR_MASS;
        self.masses[bin] += PEAK_MASS;
    }

    /// Shift the mass circularly by `degrees`, rounded to whole bins.
    ///
    /// Mass at direction `a` moves to direction `a + degrees`. Returns the
    /// rotation actually applied; callers carry the sub-bin remainder.
    pub fn rotate(&mut self, degrees: Degrees) -> Degrees {
        let n = self.len() as i64;
        let shift = (degrees / self.bin_width).round() as i64;
        let applied = shift as f64 * self.bin_width;
        if shift.rem_euclid(n) == 0 {
            return applied;
        }

        let old = self.masses.clone();
        self.masses = DVector::from_fn(self.len(), |k, _| {
            old[(k as i64 - shift).rem_euclid(n) as usize]
        });
        applied
    }

    /// Bin holding the most mass
    pub fn peak(&self) -> usize {
        self.masses.imax()
    }

    /// Draw a bin with probability proportional to its mass
    pub fn sample(&self, rng: &mut dyn RandomSource) -> usize {
        let total = self.total();
        let u = rng.next_unit().clamp(0.0, 1.0);
        if total <= 0.0 {
            return ((u * self.len() as f64) as usize).min(self.len() - 1);
        }

        let target = u * total;
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        for (bin, &mass) in self.masses.iter().enumerate() {
            if mass <= 0.0 {
                continue;
            }
            cumulative += mass;
            last_positive = bin;
            if cumulative > target {
                return bin;
            }
        }
        last_positive
    }
}

impl Default for HeadingDistribution {
    fn default() -> Self {
        Self::full_circle()
    }
}
