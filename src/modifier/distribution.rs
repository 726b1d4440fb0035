use std::f64::consts::PI;
use std::fmt;

use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};

use super::ModifyError;
use crate::config;

/// A discretized value source backing the random perturbation step.
pub trait DiscreteDistribution: fmt::Debug + Send + Sync {
    /// Human-readable name of the distribution.
    fn name(&self) -> String;

    /// Lowest point the distribution is sampled over.
    fn inf(&self) -> f64;

    /// Highest point the distribution is sampled over.
    fn sup(&self) -> f64;

    /// Draw a point restricted to `[lo, hi]`.
    fn sample_in_range(&self, lo: f64, hi: f64, rng: &mut dyn RngCore) -> f64;

    /// Snap a continuous point to its bucket and return the bucket's value.
    fn discretize(&self, x: f64) -> f64;

    /// Draw over the full `[inf, sup]` support and discretize the result.
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.discretize(self.sample_in_range(self.inf(), self.sup(), rng))
    }
}

/// Gaussian probability density scaled by a constant factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactoredGaussian {
    std_deviation: f64,
    mean: f64,
    factor: f64,
}

impl FactoredGaussian {
    pub fn new(std_deviation: f64, mean: f64, factor: f64) -> Self {
        Self {
            std_deviation,
            mean,
            factor,
        }
    }

    pub fn value_at(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std_deviation;
        self.factor * (-0.5 * z * z).exp() / (self.std_deviation * (2.0 * PI).sqrt())
    }

    pub fn std_deviation(&self) -> f64 {
        self.std_deviation
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.std_deviation * self.std_deviation
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

/// A [`FactoredGaussian`] evaluated only at the centres of `bars`
/// equal-width bars spanning `[inf, sup]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteFactoredGaussian {
    continuous: FactoredGaussian,
    inf: i32,
    sup: i32,
    bars: u32,
    bar_width: f64,
}

impl DiscreteFactoredGaussian {
    pub fn new(
        std_deviation: f64,
        mean: f64,
        factor: f64,
        inf: i32,
        sup: i32,
        bars: u32,
    ) -> Result<Self, ModifyError> {
        if std_deviation.is_nan() || std_deviation <= 0.0 {
            return Err(ModifyError::OutOfRange {
                parameter: "std_deviation",
                value: std_deviation.to_string(),
            });
        }
        if bars == 0 {
            return Err(ModifyError::OutOfRange {
                parameter: "bars",
                value: bars.to_string(),
            });
        }
        if inf >= sup {
            return Err(ModifyError::OutOfRange {
                parameter: "inf",
                value: format!("{inf} (sup is {sup})"),
            });
        }

        Ok(Self {
            continuous: FactoredGaussian::new(std_deviation, mean, factor),
            inf,
            sup,
            bars,
            bar_width: f64::from(sup - inf) / f64::from(bars),
        })
    }

    pub fn continuous(&self) -> &FactoredGaussian {
        &self.continuous
    }

    pub fn bars(&self) -> u32 {
        self.bars
    }

    fn bar_centre(&self, bar: u32) -> f64 {
        f64::from(self.inf) + (f64::from(bar) + 0.5) * self.bar_width
    }
}

impl Default for DiscreteFactoredGaussian {
    fn default() -> Self {
        Self {
            continuous: FactoredGaussian::new(
                config::DEFAULT_STD_DEVIATION,
                config::DEFAULT_MEAN,
                config::DEFAULT_FACTOR,
            ),
            inf: config::DEFAULT_GAUSSIAN_INF,
            sup: config::DEFAULT_GAUSSIAN_SUP,
            bars: config::DEFAULT_GAUSSIAN_BARS,
            bar_width: f64::from(config::DEFAULT_GAUSSIAN_SUP - config::DEFAULT_GAUSSIAN_INF)
                / f64::from(config::DEFAULT_GAUSSIAN_BARS),
        }
    }
}

impl DiscreteDistribution for DiscreteFactoredGaussian {
    fn name(&self) -> String {
        "Discrete Factored Gaussian".to_string()
    }

    fn inf(&self) -> f64 {
        f64::from(self.inf)
    }

    fn sup(&self) -> f64 {
        f64::from(self.sup)
    }

    fn sample_in_range(&self, lo: f64, hi: f64, rng: &mut dyn RngCore) -> f64 {
        let mut n = standard_normal(rng);
        for _ in 0..config::MAX_REJECTION_ATTEMPTS {
            if n >= lo && n <= hi {
                return n;
            }
            n = standard_normal(rng);
        }
        log::debug!("rejection sampling in [{lo}, {hi}] did not converge; clamping");
        n.clamp(lo, hi)
    }

    fn discretize(&self, x: f64) -> f64 {
        let last = self.bars - 1;
        let bar = if x < self.inf() {
            0
        } else if x > self.sup() {
            last
        } else {
            // a point on a boundary belongs to the lower bar
            let upper_edge = ((x - self.inf()) / self.bar_width).ceil() as u32;
            upper_edge.saturating_sub(1).min(last)
        };
        self.continuous.value_at(self.bar_centre(bar))
    }
}

/// One N(0, 1) variate.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_factored_gaussian_peak() {
        let g = FactoredGaussian::new(1.0, 0.0, 2.0);
        let peak = 2.0 / (2.0 * PI).sqrt();
        assert!((g.value_at(0.0) - peak).abs() < 1e-12);
        assert!(g.value_at(1.0) < g.value_at(0.0));
        assert!((g.value_at(1.0) - g.value_at(-1.0)).abs() < 1e-12);
        assert_eq!(g.variance(), 1.0);
    }

    #[test]
    fn test_discretize_uses_bar_centres() {
        // bars over [-5, 5] are 2 wide, centred on -4, -2, 0, 2, 4
        let d = DiscreteFactoredGaussian::default();
        let g = *d.continuous();
        assert_eq!(d.discretize(0.3), g.value_at(0.0));
        assert_eq!(d.discretize(-0.9), g.value_at(0.0));
        assert_eq!(d.discretize(1.5), g.value_at(2.0));
        assert_eq!(d.discretize(-4.9), g.value_at(-4.0));
    }

    #[test]
    fn test_discretize_boundaries_and_outliers() {
        let d = DiscreteFactoredGaussian::default();
        let g = *d.continuous();
        // exactly on the edge between bars 2 and 3: lower bar wins
        assert_eq!(d.discretize(1.0), g.value_at(0.0));
        assert_eq!(d.discretize(-5.0), g.value_at(-4.0));
        assert_eq!(d.discretize(-7.0), g.value_at(-4.0));
        assert_eq!(d.discretize(9.0), g.value_at(4.0));
        assert_eq!(d.discretize(5.0), g.value_at(4.0));
    }

    #[test]
    fn test_sample_in_range_respects_limits() {
        let d = DiscreteFactoredGaussian::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = d.sample_in_range(-0.5, 1.5, &mut rng);
            assert!((-0.5..=1.5).contains(&x));
        }
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let d = DiscreteFactoredGaussian::new(1.0, 0.0, 3.0, -5, 5, 5).unwrap();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let xs: Vec<f64> = (0..32).map(|_| d.sample(&mut a)).collect();
        let ys: Vec<f64> = (0..32).map(|_| d.sample(&mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(DiscreteFactoredGaussian::new(0.0, 0.0, 1.0, -5, 5, 5).is_err());
        assert!(DiscreteFactoredGaussian::new(1.0, 0.0, 1.0, -5, 5, 0).is_err());
        assert!(DiscreteFactoredGaussian::new(1.0, 0.0, 1.0, 5, 5, 5).is_err());
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(1234);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }
}
