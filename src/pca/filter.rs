//! Policies splitting sorted eigenpairs into "strong" and "weak" sets.

use crate::error::{Error, Result};

/// Picks how many of the leading (largest) eigenvalues count as strong.
///
/// The input to [`EigenPairFilter::filter`] is assumed sorted descending, as
/// produced by [`PcaRunner`](super::PcaRunner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EigenPairFilter {
    /// Smallest prefix explaining at least `alpha` of the total variance.
    Percentage {
        /// Fraction of total variance, in `(0, 1]`.
        alpha: f64,
    },
    /// A fixed number of strong eigenvectors.
    FirstN {
        /// Number of strong eigenvectors (capped at the dimensionality).
        n: usize,
    },
    /// Eigenvalues at or above a limit are strong.
    Limit {
        /// Absolute limit, or fraction of the largest eigenvalue when
        /// `absolute` is false.
        delta: f64,
        /// Whether `delta` is an absolute eigenvalue.
        absolute: bool,
    },
}

impl Default for EigenPairFilter {
    fn default() -> Self {
        Self::Percentage { alpha: 0.85 }
    }
}

impl EigenPairFilter {
    /// Number of strong eigenpairs for the given descending eigenvalues.
    pub fn filter(&self, eigenvalues: &[f64]) -> usize {
        match *self {
            Self::Percentage { alpha } => {
                let total: f64 = eigenvalues.iter().sum();
                let expected = alpha * total;
                let mut current = 0.0;
                for (i, &ev) in eigenvalues.iter().enumerate() {
                    current += ev;
                    if current >= expected {
                        return i + 1;
                    }
                }
                eigenvalues.len()
            }
            Self::FirstN { n } => n.min(eigenvalues.len()),
            Self::Limit { delta, absolute } => {
                let limit = if absolute {
                    delta
                } else {
                    delta * eigenvalues.first().copied().unwrap_or(0.0)
                };
                eigenvalues.iter().take_while(|&&ev| ev >= limit).count()
            }
        }
    }

    /// Check the filter's parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Percentage { alpha } if !(alpha > 0.0 && alpha <= 1.0) => {
                Err(Error::InvalidParameter {
                    name: "alpha",
                    message: "must be in (0, 1]",
                })
            }
            Self::Limit { delta, .. } if !(delta >= 0.0) => Err(Error::InvalidParameter {
                name: "delta",
                message: "must be non-negative",
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_picks_smallest_explaining_prefix() {
        let f = EigenPairFilter::Percentage { alpha: 0.85 };
        assert_eq!(f.filter(&[8.0, 1.0, 1.0]), 2);
        assert_eq!(f.filter(&[9.0, 0.5, 0.5]), 1);
        assert_eq!(f.filter(&[1.0, 1.0, 1.0]), 3);
    }

    #[test]
    fn percentage_on_zero_variance_keeps_one() {
        let f = EigenPairFilter::default();
        assert_eq!(f.filter(&[0.0, 0.0]), 1);
    }

    #[test]
    fn first_n_is_capped() {
        assert_eq!(EigenPairFilter::FirstN { n: 2 }.filter(&[3.0, 2.0, 1.0]), 2);
        assert_eq!(EigenPairFilter::FirstN { n: 7 }.filter(&[3.0, 2.0, 1.0]), 3);
    }

    #[test]
    fn limit_absolute_and_relative() {
        let abs = EigenPairFilter::Limit {
            delta: 1.5,
            absolute: true,
        };
        assert_eq!(abs.filter(&[4.0, 2.0, 1.0]), 2);
        let rel = EigenPairFilter::Limit {
            delta: 0.5,
            absolute: false,
        };
        assert_eq!(rel.filter(&[4.0, 2.0, 1.0]), 2);
        assert_eq!(rel.filter(&[4.0, 1.9, 1.0]), 1);
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert!(EigenPairFilter::Percentage { alpha: 0.0 }.validate().is_err());
        assert!(EigenPairFilter::Percentage { alpha: 1.5 }.validate().is_err());
        assert!(EigenPairFilter::Percentage { alpha: f64::NAN }.validate().is_err());
        assert!(EigenPairFilter::Limit {
            delta: -1.0,
            absolute: true
        }
        .validate()
        .is_err());
        assert!(EigenPairFilter::default().validate().is_ok());
    }
}
