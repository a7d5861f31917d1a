use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// He-style normal distribution, `N(0, sqrt(2 / fan_in))`.
pub fn he_normal(fan_in: usize) -> Result<Normal<f64>, ConfigError> {
    let std = (2. / fan_in.max(1) as f64).sqrt();
    Normal::new(0., std).map_err(|e| ConfigError::Invalid(format!("bad weight distribution: {e}")))
}

/// How fresh neuron weights are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    Constant(f64),
    Gauss { mean: f64, std: f64 },
    #[default]
    Hu,
    Uniform { low: f64, high: f64 },
}

impl Initializer {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Initializer::Constant(value) if !value.is_finite() => {
                Err(ConfigError::Invalid(format!("constant initializer must be finite, got {value}")))
            }
            Initializer::Gauss { mean, std } if !mean.is_finite() || !std.is_finite() || std < 0. => {
                Err(ConfigError::Invalid(format!("gauss initializer needs finite mean and std >= 0, got ({mean}, {std})")))
            }
            Initializer::Uniform { low, high } if !low.is_finite() || !high.is_finite() || low >= high => {
                Err(ConfigError::Invalid(format!("uniform initializer needs low < high, got ({low}, {high})")))
            }
            _ => Ok(()),
        }
    }

    /// Draws `n` weights. Call [`Initializer::validate`] first; an invalid initializer yields zeros.
    pub fn init<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        match *self {
            Initializer::Constant(value) => vec![value; n],
            Initializer::Gauss { mean, std } => match Normal::new(mean, std) {
                Ok(normal) => normal.sample_iter(rng).take(n).collect(),
                Err(_) => vec![0.; n],
            },
            Initializer::Hu => match he_normal(n) {
                Ok(normal) => normal.sample_iter(rng).take(n).collect(),
                Err(_) => vec![0.; n],
            },
            Initializer::Uniform { low, high } => {
                if low < high {
                    Uniform::new(low, high).sample_iter(rng).take(n).collect()
                } else {
                    vec![0.; n]
                }
            }
        }
    }
}
