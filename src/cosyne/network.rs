use std::io::{Read, Write};

use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxBuildHasher;

use super::error::{ConfigError, PersistError};
use super::layer::Layer;
use super::pool::WorkerPool;
use super::vector::RealVector;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Named layers fired in insertion order, each one feeding the next.
#[derive(Default)]
pub struct LayerStack {
    layers: FxIndexMap<String, Box<dyn Layer>>,
}

impl LayerStack {
    pub fn create() -> LayerStack {
        LayerStack { layers: IndexMap::with_hasher(FxBuildHasher) }
    }

    pub fn add_layer(&mut self, name: &str, layer: Box<dyn Layer>) -> Result<(), ConfigError> {
        if self.layers.contains_key(name) {
            return Err(ConfigError::Invalid(format!("duplicate layer name {name}")));
        }
        if let Some(expected) = self.output_size() {
            if layer.input_size() != expected {
                return Err(ConfigError::Invalid(format!(
                    "layer {name} takes {} inputs, previous layer gives {expected}",
                    layer.input_size()
                )));
            }
        }
        self.layers.insert(name.to_string(), layer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(|k| k.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Layer> {
        self.layers.get(name).map(|l| l.as_ref())
    }

    pub fn input_size(&self) -> Option<usize> {
        self.layers.first().map(|(_, l)| l.input_size())
    }

    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(|(_, l)| l.output_size())
    }

    pub fn fire(&self, input: &RealVector) -> RealVector {
        self.layers.values().fold(input.clone(), |signal, layer| layer.fire(&signal))
    }

    pub fn apply_reward(&mut self, reward: f64) {
        for layer in self.layers.values_mut() {
            layer.apply_reward(reward);
        }
    }

    /// Ticks every layer, each one on whichever pool worker claims it.
    pub fn shuttle(&mut self, pool: &WorkerPool) {
        let mut layers: Vec<&mut Box<dyn Layer>> = self.layers.values_mut().collect();
        pool.for_each_mut(&mut layers, |_, layer| layer.tick());
    }

    pub fn save(&self, out: &mut dyn Write) -> Result<(), PersistError> {
        for layer in self.layers.values() {
            layer.save(out)?;
        }
        Ok(())
    }

    /// Loads layers in order. A rejected layer stops the load; layers before it keep
    /// the loaded state, the rejected one and those after it are unchanged.
    pub fn load(&mut self, input: &mut dyn Read) -> Result<(), PersistError> {
        for (name, layer) in self.layers.iter_mut() {
            layer.load(input)?;
            debug!("stack: layer {name} loaded");
        }
        Ok(())
    }
}
