use std::io::{Read, Write};

use log::{debug, warn};
use rand::RngCore;
use rayon::prelude::*;

use super::activation::Activation;
use super::codec::{self, LayerKind};
use super::common::Settings;
use super::error::{ConfigError, PersistError, Shape};
use super::layer::Layer;
use super::parameter_vector::ParameterVector;
use super::pool::WorkerPool;
use super::registry::IdRegistry;
use super::slot::ParameterSlot;
use super::vector::RealVector;

/// `OutputSize` parameter vectors sharing one input, trained by per-weight selection.
#[derive(Clone, Debug)]
pub struct EvolvedLayer {
    id: u32,
    input_size: usize,
    vectors: Vec<ParameterVector>,
    activation: Activation,
    settings: Settings,
}

impl EvolvedLayer {
    pub fn setup<R: RngCore>(rng: &mut R, registry: &mut IdRegistry, input_size: usize, output_size: usize, settings: &Settings) -> Result<EvolvedLayer, ConfigError> {
        settings.validate()?;
        if output_size == 0 {
            return Err(ConfigError::Invalid("output size must be at least 1".to_string()));
        }
        let id = registry.next_id();
        let vectors = (0..output_size)
            .map(|_| ParameterVector::setup(rng, registry, input_size, settings))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("layer {id}: set up {input_size}x{output_size} with populus {}", settings.populus);
        Ok(EvolvedLayer {
            id,
            input_size,
            vectors,
            activation: Activation::default(),
            settings: settings.clone(),
        })
    }

    pub fn with_activation(mut self, activation: Activation) -> EvolvedLayer {
        self.activation = activation;
        self
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vectors(&self) -> &[ParameterVector] {
        &self.vectors
    }

    pub fn shape(&self) -> Shape {
        Shape {
            input: self.input_size,
            output: self.vectors.len(),
            populus: self.settings.populus,
        }
    }

    /// Same result as [`Layer::fire`], with the output units spread over the pool.
    pub fn fire_parallel(&self, input: &RealVector, pool: &WorkerPool) -> RealVector {
        let mut output: RealVector = pool.map(&self.vectors, |_, vector| vector.fire(input)).into();
        self.activation.activate(&mut output);
        output
    }
}

impl Layer for EvolvedLayer {
    fn id(&self) -> u32 {
        self.id
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.vectors.len()
    }

    fn fire(&self, input: &RealVector) -> RealVector {
        debug_assert!(input.len() == self.input_size, "Tried to fire a layer with an input of the wrong size");
        let mut output: RealVector = self.vectors.iter().map(|vector| vector.fire(input)).collect();
        self.activation.activate(&mut output);
        output
    }

    /// Broadcast as is: the reward is not divided by the number of output units.
    fn apply_reward(&mut self, reward: f64) {
        for vector in self.vectors.iter_mut() {
            vector.apply_reward(reward, &self.settings);
        }
    }

    /// Vectors tick on the rayon pool of the calling thread, the [`WorkerPool`] when shuttled.
    fn tick(&mut self) {
        let settings = &self.settings;
        self.vectors.par_iter_mut().for_each(|vector| vector.tick(settings));
    }

    fn save(&self, out: &mut dyn Write) -> Result<(), PersistError> {
        codec::write_header(out, LayerKind::Evolved, self.shape())?;
        for vector in self.vectors.iter() {
            vector.save(out)?;
        }
        for slot in self.vectors.iter().flat_map(|v| v.slots()) {
            codec::write_u16(out, slot.active_index() as u16)?;
        }
        debug!("layer {}: saved", self.id);
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<(), PersistError> {
        let staged = read_layer(input, self.shape());
        match staged {
            Ok(staged) => {
                for (vector, slots) in self.vectors.iter_mut().zip(staged) {
                    vector.replace_slots(slots);
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

fn read_layer(input: &mut dyn Read, shape: Shape) -> Result<Vec<Vec<ParameterSlot>>, PersistError> {
    codec::read_header(input, LayerKind::Evolved, shape)?;
    let mut staged = (0..shape.output)
        .map(|_| ParameterVector::read_slots(input, shape.input, shape.populus))
        .collect::<Result<Vec<_>, _>>()?;
    for slot in staged.iter_mut().flatten() {
        let active_index = codec::read_u16(input)?;
        slot.set_active_index(active_index as usize)?;
    }
    Ok(staged)
}
