use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::initializer::Initializer;
use super::vector::RealVector;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    #[default]
    OnePoint,
    Uniform,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    Gauss { mean: f64, std: f64, probability: f64 },
    None,
}

impl Default for Mutation {
    fn default() -> Mutation {
        Mutation::Gauss { mean: 0., std: 0.01, probability: 0.1 }
    }
}

impl Mutation {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Mutation::Gauss { mean, std, probability } => {
                if !mean.is_finite() || !std.is_finite() || std < 0. || !(0.0..=1.0).contains(&probability) {
                    Err(ConfigError::Invalid(format!("bad gauss mutation ({mean}, {std}, {probability})")))
                } else {
                    Ok(())
                }
            }
            Mutation::None => Ok(()),
        }
    }
}

/// Bias-free neuron: a weight vector plus the bookkeeping the genetic loop needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Neuron {
    pub weights: RealVector,
    pub score: f64,
    pub use_count: usize,
}

impl Neuron {
    pub fn setup<R: Rng>(rng: &mut R, initializer: &Initializer, input_size: usize) -> Neuron {
        Neuron::create(initializer.init(rng, input_size).into())
    }

    pub fn create(weights: RealVector) -> Neuron {
        Neuron { weights, score: 0., use_count: 0 }
    }

    pub fn input_size(&self) -> usize {
        self.weights.len()
    }

    pub fn fire(&self, input: &RealVector) -> f64 {
        self.weights.dot(input)
    }

    pub fn give_reward(&mut self, reward: f64) {
        self.score += reward;
    }

    pub fn use_once(&mut self) {
        self.use_count += 1;
    }

    pub fn used(&self) -> usize {
        self.use_count
    }

    pub fn reset(&mut self) {
        self.score = 0.;
        self.use_count = 0;
    }

    pub fn crossover<R: Rng>(&self, rng: &mut R, policy: Crossover, other: &Neuron) -> Neuron {
        debug_assert!(self.input_size() == other.input_size(), "Neurons with mismatching input size cannot be crossed");
        let n = self.input_size();
        let weights = match policy {
            Crossover::OnePoint => {
                let cut = if n > 0 { rng.gen_range(0..=n) } else { 0 };
                self.weights.iter().take(cut).chain(other.weights.iter().skip(cut)).copied().collect()
            }
            Crossover::Uniform => self
                .weights
                .iter()
                .zip(other.weights.iter())
                .map(|(&a, &b)| if rng.gen_bool(0.5) { a } else { b })
                .collect(),
        };
        Neuron::create(weights)
    }

    pub fn mutate<R: Rng>(&mut self, rng: &mut R, policy: &Mutation) {
        if let Mutation::Gauss { mean, std, probability } = *policy {
            let Ok(normal) = Normal::new(mean, std) else {
                return;
            };
            for weight in self.weights.iter_mut() {
                if rng.gen::<f64>() < probability {
                    *weight += normal.sample(rng);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn fire_and_bookkeeping() {
        let mut neuron = Neuron::create(vec![0.5, -1.0].into());
        assert_approx_eq!(neuron.fire(&vec![2.0, 1.0].into()), 0.0);
        neuron.give_reward(1.5);
        neuron.give_reward(-0.5);
        neuron.use_once();
        assert_eq!(neuron.score, 1.0);
        assert_eq!(neuron.used(), 1);
        neuron.reset();
        assert_eq!((neuron.score, neuron.used()), (0., 0));
    }

    #[test]
    fn crossover_takes_genes_from_parents() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let a = Neuron::create(vec![1.0; 6].into());
        let b = Neuron::create(vec![2.0; 6].into());
        for policy in [Crossover::OnePoint, Crossover::Uniform] {
            let child = a.crossover(&mut rng, policy, &b);
            assert_eq!(child.input_size(), 6);
            assert_eq!(child.score, 0.);
            assert!(child.weights.iter().all(|&w| w == 1.0 || w == 2.0));
        }
        // one point keeps a prefix of the first parent
        let child = a.crossover(&mut rng, Crossover::OnePoint, &b);
        let first_two = child.weights.iter().position(|&w| w == 2.0).unwrap_or(6);
        assert!(child.weights.iter().skip(first_two).all(|&w| w == 2.0));
    }

    #[test]
    fn mutation_policies() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12);
        let mut neuron = Neuron::create(vec![0.0; 20].into());
        neuron.mutate(&mut rng, &Mutation::None);
        assert!(neuron.weights.iter().all(|&w| w == 0.));
        neuron.mutate(&mut rng, &Mutation::Gauss { mean: 0., std: 1., probability: 1. });
        assert!(neuron.weights.iter().all(|&w| w != 0.));
        assert!(Mutation::Gauss { mean: 0., std: 1., probability: 2. }.validate().is_err());
    }
}
