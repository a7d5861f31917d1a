use log::debug;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::common::PopulationSettings;
use super::error::ConfigError;
use super::initializer::Initializer;
use super::neuron::{Crossover, Mutation, Neuron};
use super::vector::RealVector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronIndex(pub usize);

/// Elitist genetic algorithm over whole neurons. Each tick a small working set is drawn
/// from the population; once enough neurons have been used, the population mates.
#[derive(Clone, Debug)]
pub struct NeuronPopulation {
    population: Vec<Neuron>,
    workers: Vec<NeuronIndex>,
    best_workers: Vec<NeuronIndex>,
    mating_counter: usize,
    crossover: Crossover,
    mutation: Mutation,
    settings: PopulationSettings,
    rng: Xoshiro256PlusPlus,
}

impl NeuronPopulation {
    pub fn setup<R: RngCore>(
        rng: &mut R,
        initializer: &Initializer,
        input_size: usize,
        crossover: Crossover,
        mutation: Mutation,
        settings: &PopulationSettings,
    ) -> Result<NeuronPopulation, ConfigError> {
        settings.validate()?;
        initializer.validate()?;
        mutation.validate()?;
        if input_size == 0 {
            return Err(ConfigError::Invalid("input size must be at least 1".to_string()));
        }
        let mut local_rng = Xoshiro256PlusPlus::seed_from_u64(rng.gen());
        let population = (0..settings.populus)
            .map(|_| Neuron::setup(&mut local_rng, initializer, input_size))
            .collect();
        let mut res = NeuronPopulation {
            population,
            workers: Vec::with_capacity(settings.working),
            best_workers: Vec::new(),
            mating_counter: 0,
            crossover,
            mutation,
            settings: settings.clone(),
            rng: local_rng,
        };
        res.choose_workers();
        Ok(res)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.population
    }

    pub fn workers(&self) -> &[NeuronIndex] {
        &self.workers
    }

    pub fn best_workers(&self) -> &[NeuronIndex] {
        &self.best_workers
    }

    pub fn mating_counter(&self) -> usize {
        self.mating_counter
    }

    pub fn settings(&self) -> &PopulationSettings {
        &self.settings
    }

    pub fn input_size(&self) -> usize {
        self.population[0].input_size()
    }

    /// Draws `Working` neurons uniformly, with replacement.
    pub fn choose_workers(&mut self) {
        let populus = self.population.len();
        self.workers.clear();
        for _ in 0..self.settings.working {
            self.workers.push(NeuronIndex(self.rng.gen_range(0..populus)));
        }
    }

    pub fn remember_workers(&mut self) {
        self.best_workers.clone_from(&self.workers);
    }

    /// Goes back to the last remembered working set, if there is one.
    pub fn recall_workers(&mut self) -> bool {
        if self.best_workers.is_empty() {
            return false;
        }
        self.workers.clone_from(&self.best_workers);
        true
    }

    /// Mean output of the working set.
    pub fn fire(&self, input: &RealVector) -> f64 {
        let total: f64 = self.workers.iter().map(|w| self.population[w.0].fire(input)).sum();
        total / self.workers.len() as f64
    }

    pub fn give_reward(&mut self, reward: f64) {
        let share = reward / self.workers.len() as f64;
        let uses_to_mating = self.settings.uses_to_mating;
        for worker in self.workers.iter() {
            let neuron = &mut self.population[worker.0];
            neuron.give_reward(share);
            if neuron.used() < uses_to_mating {
                neuron.use_once();
                if neuron.used() == uses_to_mating {
                    self.mating_counter += 1;
                }
            }
        }
    }

    pub fn ready_to_mate(&self) -> bool {
        self.mating_counter as f64 >= self.settings.mating_trigger()
    }

    pub fn maiting(&mut self, initializer: &Initializer) {
        let populus = self.population.len();
        let input_size = self.input_size();
        self.mating_counter = 0;

        self.population.sort_by(|a, b| b.score.total_cmp(&a.score));
        let best_score = self.population[0].score;

        let survivors = self.settings.survivors();
        for neuron in self.population.iter_mut().take(survivors) {
            neuron.reset();
        }

        let mut next = survivors;
        let mut parent = 0;
        while parent + 1 < survivors && next < populus {
            let mut child = self.population[parent].crossover(&mut self.rng, self.crossover, &self.population[parent + 1]);
            child.mutate(&mut self.rng, &self.mutation);
            self.population[next] = child;
            next += 1;
            parent += 2;
        }
        let children = next - survivors;

        for i in next..populus {
            let mut fresh = Neuron::setup(&mut self.rng, initializer, input_size);
            fresh.mutate(&mut self.rng, &self.mutation);
            self.population[i] = fresh;
        }

        // indices changed meaning with the new generation
        self.best_workers.clear();
        debug!("mating: best score {best_score}, {survivors} kept, {children} bred, {} fresh", populus - next);
    }

    pub(crate) fn restore(&mut self, population: Vec<Neuron>, mating_counter: usize) {
        debug_assert!(population.len() == self.population.len(), "Tried to restore a population of a different size");
        self.population = population;
        self.mating_counter = mating_counter;
        self.best_workers.clear();
        self.choose_workers();
    }
}
