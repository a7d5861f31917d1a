use std::io::{Read, Write};

use rand::{Rng, RngCore, SeedableRng};
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::common::Settings;
use super::error::{ConfigError, PersistError};
use super::initializer::he_normal;
use super::registry::IdRegistry;
use super::slot::{ParameterSlot, RewardAccumulator};
use super::vector::RealVector;

/// `InputSize` slots computing one dot product. Owns its own generator so vectors can
/// be ticked on different threads without sharing random state.
#[derive(Clone, Debug)]
pub struct ParameterVector {
    slots: Vec<ParameterSlot>,
    weights: RealVector,
    reward: RewardAccumulator,
    noise: Normal<f64>,
    rng: Xoshiro256PlusPlus,
}

impl ParameterVector {
    pub fn setup<R: RngCore>(rng: &mut R, registry: &mut IdRegistry, input_size: usize, settings: &Settings) -> Result<ParameterVector, ConfigError> {
        settings.validate()?;
        if input_size == 0 {
            return Err(ConfigError::Invalid("input size must be at least 1".to_string()));
        }
        let noise = he_normal(input_size)?;
        let mut local_rng = Xoshiro256PlusPlus::seed_from_u64(rng.gen());
        let slots: Vec<_> = (0..input_size)
            .map(|_| ParameterSlot::setup(&mut local_rng, registry.next_id(), settings.populus, &noise))
            .collect();
        let weights = slots.iter().map(|s| s.weight()).collect();
        Ok(ParameterVector {
            slots,
            weights,
            reward: RewardAccumulator::default(),
            noise,
            rng: local_rng,
        })
    }

    pub fn input_size(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }

    /// Materialized active weights, always equal to the slots' active candidates.
    pub fn weights(&self) -> &RealVector {
        &self.weights
    }

    pub fn reward(&self) -> &RewardAccumulator {
        &self.reward
    }

    pub fn fire(&self, input: &RealVector) -> f64 {
        (&self.weights * input).reduce()
    }

    /// Every slot of the vector receives the same reward, which lands in the shared accumulator.
    pub fn apply_reward(&mut self, reward: f64, settings: &Settings) {
        self.reward.give_reward(reward, settings.momentum_gain);
    }

    pub fn tick(&mut self, settings: &Settings) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.tick(&self.reward, &self.noise, settings, &mut self.rng) {
                self.weights[i] = slot.weight();
            }
        }
        self.reward.consume();
    }

    pub fn save(&self, out: &mut dyn Write) -> Result<(), PersistError> {
        for slot in self.slots.iter() {
            slot.save(out)?;
        }
        Ok(())
    }

    /// Reads this vector's records into detached slots without touching `self`.
    pub fn read_slots(input: &mut dyn Read, input_size: usize, populus: usize) -> Result<Vec<ParameterSlot>, PersistError> {
        (0..input_size).map(|_| ParameterSlot::load(input, populus)).collect()
    }

    /// Installs slots produced by [`ParameterVector::read_slots`] and re-materializes the weights.
    pub fn replace_slots(&mut self, slots: Vec<ParameterSlot>) {
        debug_assert!(slots.len() == self.slots.len(), "Tried to replace slots with a different count");
        self.weights = slots.iter().map(|s| s.weight()).collect();
        self.slots = slots;
    }
}
