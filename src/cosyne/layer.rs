use std::io::{Read, Write};

use super::error::PersistError;
use super::vector::RealVector;

/// What every trainable layer offers to the code driving it. Construction (`setup`)
/// belongs to each implementation since the inputs differ.
pub trait Layer: Send {
    fn id(&self) -> u32;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    fn fire(&self, input: &RealVector) -> RealVector;

    fn apply_reward(&mut self, reward: f64);

    /// Periodic maintenance, independent of reward delivery.
    fn tick(&mut self);

    fn save(&self, out: &mut dyn Write) -> Result<(), PersistError>;

    /// Either loads the whole layer or returns an error and leaves it untouched.
    fn load(&mut self, input: &mut dyn Read) -> Result<(), PersistError>;
}
