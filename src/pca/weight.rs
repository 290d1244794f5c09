//! Weight functions for weighted covariance.
//!
//! A weight is a function of a point's distance to the centroid, given the
//! maximum such distance and the root-mean-square distance of the set.

/// ln(10): weights at the maximum distance fall to 0.1.
const LN10: f64 = std::f64::consts::LN_10;

/// How points are weighted when building a covariance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightFunction {
    /// Every point counts equally.
    #[default]
    Constant,
    /// Linear decay from 1 at the centroid to 0.1 at the maximum distance.
    Linear,
    /// Gaussian decay scaled so the weight at the maximum distance is 0.1.
    Gaussian,
    /// Gaussian density with the set's RMS distance as standard deviation.
    GaussianStddev,
    /// Exponential decay to 0.1 at the maximum distance.
    Exponential,
}

impl WeightFunction {
    /// Weight of a point at `distance` from the centroid.
    pub fn weight(&self, distance: f64, max: f64, stddev: f64) -> f64 {
        match self {
            Self::Constant => 1.0,
            _ if max <= 0.0 => 1.0,
            Self::Linear => 1.0 - 0.9 * distance / max,
            Self::Gaussian => (-LN10 * distance * distance / (max * max)).exp(),
            Self::GaussianStddev => {
                if stddev <= 0.0 {
                    return 1.0;
                }
                let z = distance / stddev;
                (-0.5 * z * z).exp() / (stddev * (2.0 * std::f64::consts::PI).sqrt())
            }
            Self::Exponential => (-LN10 * distance / max).exp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decays_to_a_tenth_at_max() {
        for f in [
            WeightFunction::Linear,
            WeightFunction::Gaussian,
            WeightFunction::Exponential,
        ] {
            assert!((f.weight(0.0, 2.0, 1.0) - 1.0).abs() < 1e-12, "{f:?}");
            assert!((f.weight(2.0, 2.0, 1.0) - 0.1).abs() < 1e-12, "{f:?}");
        }
    }

    #[test]
    fn degenerate_spread_falls_back_to_unit_weight() {
        assert_eq!(WeightFunction::Gaussian.weight(0.0, 0.0, 0.0), 1.0);
        assert_eq!(WeightFunction::GaussianStddev.weight(1.0, 2.0, 0.0), 1.0);
    }
}
