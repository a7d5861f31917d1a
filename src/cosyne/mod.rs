pub mod activation;
pub mod codec;
pub mod common;
pub mod error;
pub mod evolved_layer;
pub mod initializer;
pub mod layer;
pub mod network;
pub mod neuron;
pub mod parameter_vector;
pub mod pool;
pub mod population;
pub mod population_layer;
pub mod registry;
pub mod slot;
pub mod vector;
