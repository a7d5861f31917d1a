use std::io::{Read, Write};

use log::{debug, warn};
use rand::RngCore;

use super::activation::Activation;
use super::codec::{self, LayerKind};
use super::common::PopulationSettings;
use super::error::{ConfigError, PersistError, Shape};
use super::initializer::Initializer;
use super::layer::Layer;
use super::neuron::{Crossover, Mutation, Neuron};
use super::population::NeuronPopulation;
use super::registry::IdRegistry;
use super::vector::RealVector;

/// Neuron-granularity layer: one [`NeuronPopulation`] per output unit.
#[derive(Clone, Debug)]
pub struct PopulationLayer {
    id: u32,
    input_size: usize,
    populations: Vec<NeuronPopulation>,
    initializer: Initializer,
    activation: Activation,
}

struct StagedPopulation {
    neurons: Vec<Neuron>,
    mating_counter: usize,
}

impl PopulationLayer {
    #[allow(clippy::too_many_arguments)]
    pub fn setup<R: RngCore>(
        rng: &mut R,
        registry: &mut IdRegistry,
        input_size: usize,
        output_size: usize,
        settings: &PopulationSettings,
        initializer: Initializer,
        crossover: Crossover,
        mutation: Mutation,
    ) -> Result<PopulationLayer, ConfigError> {
        if output_size == 0 {
            return Err(ConfigError::Invalid("output size must be at least 1".to_string()));
        }
        let id = registry.next_id();
        let populations = (0..output_size)
            .map(|_| NeuronPopulation::setup(rng, &initializer, input_size, crossover, mutation, settings))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("layer {id}: set up {input_size}x{output_size} neuron populations of {}", settings.populus);
        Ok(PopulationLayer {
            id,
            input_size,
            populations,
            initializer,
            activation: Activation::default(),
        })
    }

    pub fn with_activation(mut self, activation: Activation) -> PopulationLayer {
        self.activation = activation;
        self
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn populations(&self) -> &[NeuronPopulation] {
        &self.populations
    }

    pub fn populus(&self) -> usize {
        self.populations[0].settings().populus
    }

    pub fn shape(&self) -> Shape {
        Shape {
            input: self.input_size,
            output: self.populations.len(),
            populus: self.populus(),
        }
    }

    pub fn remember_workers(&mut self) {
        for population in self.populations.iter_mut() {
            population.remember_workers();
        }
    }

    pub fn recall_workers(&mut self) {
        for population in self.populations.iter_mut() {
            population.recall_workers();
        }
    }
}

impl Layer for PopulationLayer {
    fn id(&self) -> u32 {
        self.id
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.populations.len()
    }

    fn fire(&self, input: &RealVector) -> RealVector {
        debug_assert!(input.len() == self.input_size, "Tried to fire a layer with an input of the wrong size");
        let mut output: RealVector = self.populations.iter().map(|p| p.fire(input)).collect();
        self.activation.activate(&mut output);
        output
    }

    fn apply_reward(&mut self, reward: f64) {
        for population in self.populations.iter_mut() {
            population.give_reward(reward);
        }
    }

    fn tick(&mut self) {
        for population in self.populations.iter_mut() {
            if population.ready_to_mate() {
                population.maiting(&self.initializer);
            }
            population.choose_workers();
        }
    }

    fn save(&self, out: &mut dyn Write) -> Result<(), PersistError> {
        codec::write_header(out, LayerKind::Population, self.shape())?;
        for population in self.populations.iter() {
            for neuron in population.neurons() {
                for &weight in neuron.weights.iter() {
                    codec::write_real(out, weight)?;
                }
                codec::write_real(out, neuron.score)?;
                codec::write_u16(out, neuron.used() as u16)?;
            }
            codec::write_u32(out, population.mating_counter() as u32)?;
        }
        debug!("layer {}: saved", self.id);
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<(), PersistError> {
        let uses_to_mating = self.populations[0].settings().uses_to_mating;
        match read_layer(input, self.shape(), uses_to_mating) {
            Ok(staged) => {
                for (population, staged) in self.populations.iter_mut().zip(staged) {
                    population.restore(staged.neurons, staged.mating_counter);
                }
                debug!("layer {}: loaded", self.id);
                Ok(())
            }
            Err(e) => {
                warn!("layer {}: load rejected, state kept: {}", self.id, e);
                Err(e)
            }
        }
    }
}

fn read_layer(input: &mut dyn Read, shape: Shape, uses_to_mating: usize) -> Result<Vec<StagedPopulation>, PersistError> {
    codec::read_header(input, LayerKind::Population, shape)?;
    let mut staged = Vec::with_capacity(shape.output);
    for _ in 0..shape.output {
        let mut neurons = Vec::with_capacity(shape.populus);
        for _ in 0..shape.populus {
            let weights = (0..shape.input).map(|_| codec::read_real(input)).collect::<Result<RealVector, _>>()?;
            let score = codec::read_real(input)?;
            let use_count = codec::read_u16(input)? as usize;
            if use_count > uses_to_mating {
                return Err(PersistError::Corrupt(format!("use count {use_count} above {uses_to_mating}")));
            }
            neurons.push(Neuron { weights, score, use_count });
        }
        let mating_counter = codec::read_u32(input)? as usize;
        if mating_counter > shape.populus {
            return Err(PersistError::Corrupt(format!("mating counter {mating_counter} above populus {}", shape.populus)));
        }
        staged.push(StagedPopulation { neurons, mating_counter });
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn layer(seed: u64, input_size: usize, output_size: usize) -> PopulationLayer {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut registry = IdRegistry::default();
        PopulationLayer::setup(
            &mut rng,
            &mut registry,
            input_size,
            output_size,
            &PopulationSettings::default(),
            Initializer::Hu,
            Crossover::Uniform,
            Mutation::default(),
        )
        .unwrap()
    }

    #[test]
    fn fire_is_per_population_mean() {
        let layer = layer(1, 3, 2).with_activation(Activation::Sigmoid);
        let input = RealVector::from(vec![0.3, -0.2, 1.0]);
        let output = layer.fire(&input);
        assert_eq!(output.len(), 2);
        for (value, population) in output.iter().zip(layer.populations()) {
            let raw = population.fire(&input);
            assert_approx_eq!(*value, raw.exp() / (raw.exp() + 1.));
        }
    }

    #[test]
    fn ticking_eventually_mates() {
        let mut layer = layer(2, 2, 3);
        let mut generations = 0;
        for step in 0..400 {
            layer.apply_reward((step % 5) as f64 - 2.);
            let before: Vec<usize> = layer.populations().iter().map(|p| p.mating_counter()).collect();
            let ready = layer.populations().iter().filter(|p| p.ready_to_mate()).count();
            layer.tick();
            generations += ready;
            for (population, &counter) in layer.populations().iter().zip(before.iter()) {
                assert_eq!(population.neurons().len(), 10);
                if counter >= 5 {
                    assert_eq!(population.mating_counter(), 0);
                }
            }
        }
        assert!(generations > 0);
    }

    #[test]
    fn round_trip_restores_populations() {
        let mut source = layer(3, 2, 2);
        for step in 0..37 {
            source.apply_reward(step as f64 * 0.1);
            source.tick();
        }
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let mut target = layer(4, 2, 2);
        target.load(&mut buf.as_slice()).unwrap();
        for (a, b) in source.populations().iter().zip(target.populations()) {
            assert_eq!(a.neurons(), b.neurons());
            assert_eq!(a.mating_counter(), b.mating_counter());
        }
    }

    #[test]
    fn recall_restores_working_sets() {
        let mut layer = layer(7, 2, 3);
        let input = RealVector::from(vec![1.0, 1.0]);
        let remembered = layer.fire(&input);
        layer.remember_workers();
        layer.tick();
        layer.recall_workers();
        assert_eq!(layer.fire(&input), remembered);
    }

    #[test]
    fn evolved_stream_is_rejected() {
        let source = layer(5, 2, 2);
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();
        buf[4] = LayerKind::Evolved as u8;

        let mut target = layer(6, 2, 2);
        let before: Vec<_> = target.populations().iter().map(|p| p.neurons().to_vec()).collect();
        assert!(matches!(target.load(&mut buf.as_slice()), Err(PersistError::BadTag { .. })));
        let after: Vec<_> = target.populations().iter().map(|p| p.neurons().to_vec()).collect();
        assert_eq!(before, after);
    }
}
