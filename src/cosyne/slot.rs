use std::io::{Read, Write};

use itertools::Itertools;
use log::{debug, trace};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::codec;
use super::common::Settings;
use super::error::PersistError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub weight: f64,
    pub fitness: f64,
}

/// Reward collected by one parameter vector between two ticks. Every slot of the
/// vector sees the same value, so it is kept once per vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardAccumulator {
    pub accumulated: f64,
    pub previous: f64,
    pub previous_tick_negative: bool,
}

impl RewardAccumulator {
    pub fn give_reward(&mut self, reward: f64, momentum_gain: f64) {
        self.accumulated += reward + momentum_gain * (reward - self.previous);
        self.previous = reward;
    }

    /// Closes the tick: remembers the sign of what was accumulated and clears it.
    pub fn consume(&mut self) {
        self.previous_tick_negative = self.accumulated < 0.;
        self.accumulated = 0.;
    }
}

/// One scalar weight: a fixed population of candidate values, one of them active.
#[derive(Clone, Debug)]
pub struct ParameterSlot {
    id: u32,
    population: Vec<Candidate>,
    active_index: usize,
    swap_count: u16,
    best_weight_sum: f64,
    best_weight_count: u16,
    worst_fitness_seen: f64,
}

impl ParameterSlot {
    pub fn setup<R: Rng>(rng: &mut R, id: u32, populus: usize, weights: &Normal<f64>) -> ParameterSlot {
        debug_assert!(populus > 0, "Tried to set up a slot with an empty population");
        let population = (0..populus)
            .map(|_| Candidate { weight: weights.sample(rng), fitness: 0. })
            .collect();
        ParameterSlot {
            id,
            population,
            active_index: rng.gen_range(0..populus),
            swap_count: 0,
            best_weight_sum: 0.,
            best_weight_count: 0,
            worst_fitness_seen: 0.,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn populus(&self) -> usize {
        self.population.len()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.population
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn swap_count(&self) -> u16 {
        self.swap_count
    }

    pub fn best_weight_count(&self) -> u16 {
        self.best_weight_count
    }

    pub fn best_weight_mean(&self) -> Option<f64> {
        if self.best_weight_count > 0 {
            Some(self.best_weight_sum / self.best_weight_count as f64)
        } else {
            None
        }
    }

    pub fn worst_fitness_seen(&self) -> f64 {
        self.worst_fitness_seen
    }

    /// The weight currently used for computation.
    pub fn weight(&self) -> f64 {
        self.population[self.active_index].weight
    }

    /// Probability of switching the active candidate after a tick. Negative whenever
    /// the fitness is negative, which makes the switch impossible for such a tick.
    pub fn switch_probability(fitness: f64, accumulated: f64, settings: &Settings) -> f64 {
        if fitness < 0. {
            (settings.switch_gain * accumulated).min(settings.max_switch_probability)
        } else {
            settings.base_switch_probability
        }
    }

    /// Scores the active candidate with the reward of this tick and possibly switches to
    /// another one. Returns true when a switch happened.
    pub fn tick<R: Rng>(&mut self, reward: &RewardAccumulator, weights: &Normal<f64>, settings: &Settings, rng: &mut R) -> bool {
        let accumulated = reward.accumulated;
        let active = &mut self.population[self.active_index];

        active.fitness = accumulated + settings.fitness_decay * active.fitness;
        if accumulated >= 0. {
            active.fitness = accumulated;
        }
        let fitness = active.fitness;
        let weight = active.weight;

        if fitness < self.worst_fitness_seen {
            self.worst_fitness_seen = fitness;
        }

        let switch_probability = ParameterSlot::switch_probability(fitness, accumulated, settings);
        if fitness >= 0. && reward.previous_tick_negative {
            self.record_best_weight(weight);
        }

        let u: f64 = rng.gen();
        if u < switch_probability && self.population.len() > 1 {
            self.switch_active(rng);
            if self.swap_count as usize >= settings.swaps_to_selection() {
                self.selection(weights, settings, rng);
                self.swap_count = 0;
            }
            true
        } else {
            false
        }
    }

    fn record_best_weight(&mut self, weight: f64) {
        self.best_weight_sum += weight;
        self.best_weight_count += 1;
        if self.best_weight_count as usize > self.population.len() {
            self.best_weight_sum /= self.best_weight_count as f64;
            self.best_weight_count = 1;
        }
    }

    fn switch_active<R: Rng>(&mut self, rng: &mut R) {
        let populus = self.population.len();
        let u: f64 = rng.gen();
        let jump = (u * (populus - 2) as f64).floor() as usize;
        let previous = self.active_index;
        self.active_index = (self.active_index + jump) % (populus - 1);
        self.swap_count = self.swap_count.saturating_add(1);
        trace!("slot {}: active candidate {} -> {} (swap {})", self.id, previous, self.active_index, self.swap_count);
    }

    fn give_new_weight<R: Rng>(&self, weights: &Normal<f64>, settings: &Settings, rng: &mut R) -> f64 {
        match self.best_weight_mean() {
            Some(mean) => {
                if rng.gen::<f64>() < settings.best_weight_reuse_probability {
                    mean
                } else {
                    mean + weights.sample(rng)
                }
            }
            None => weights.sample(rng),
        }
    }

    /// Ranks the population by fitness and reseeds it, worse ranks being replaced more often.
    pub fn selection<R: Rng>(&mut self, weights: &Normal<f64>, settings: &Settings, rng: &mut R) {
        let populus = self.population.len();
        self.population = self
            .population
            .iter()
            .copied()
            .sorted_by(|a, b| b.fitness.total_cmp(&a.fitness))
            .collect();

        let step = settings.selection_pressure / populus as f64;
        for i in 0..populus {
            let replace_probability = step * (i + 1) as f64;
            if rng.gen::<f64>() < replace_probability {
                self.population[i].weight = self.give_new_weight(weights, settings, rng);
            }
        }

        for candidate in self.population.iter_mut() {
            candidate.fitness = 0.;
        }
        self.worst_fitness_seen = 0.;
        debug!("slot {}: selection, active weight now {}", self.id, self.weight());
    }

    pub fn save(&self, out: &mut dyn Write) -> Result<(), PersistError> {
        codec::write_u32(out, self.id)?;
        codec::write_u16(out, self.swap_count)?;
        for candidate in self.population.iter() {
            codec::write_real(out, candidate.weight)?;
            codec::write_real(out, candidate.fitness)?;
        }
        codec::write_real(out, self.best_weight_sum)?;
        codec::write_u16(out, self.best_weight_count)?;
        codec::write_real(out, self.worst_fitness_seen)
    }

    /// Reads one record into a detached slot. The active index is not part of the record
    /// and starts at zero; the caller restores it.
    pub fn load(input: &mut dyn Read, populus: usize) -> Result<ParameterSlot, PersistError> {
        let id = codec::read_u32(input)?;
        let swap_count = codec::read_u16(input)?;
        let mut population = Vec::with_capacity(populus);
        for _ in 0..populus {
            let weight = codec::read_real(input)?;
            let fitness = codec::read_real(input)?;
            population.push(Candidate { weight, fitness });
        }
        let best_weight_sum = codec::read_real(input)?;
        let best_weight_count = codec::read_u16(input)?;
        let worst_fitness_seen = codec::read_real(input)?;
        Ok(ParameterSlot {
            id,
            population,
            active_index: 0,
            swap_count,
            best_weight_sum,
            best_weight_count,
            worst_fitness_seen,
        })
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<(), PersistError> {
        if index >= self.population.len() {
            return Err(PersistError::Corrupt(format!(
                "active index {index} out of range for populus {} in slot {}",
                self.population.len(),
                self.id
            )));
        }
        self.active_index = index;
        Ok(())
    }
}
