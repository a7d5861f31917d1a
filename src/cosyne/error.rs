use std::fmt;
use std::io;

use thiserror::Error;

/// Declared layer dimensions, as written into (and checked against) a persisted header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub input: usize,
    pub output: usize,
    pub populus: usize,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} (populus {})", self.input, self.output, self.populus)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("could not start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("stream not good: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected layer tag {found:#04x}, expected {expected:#04x}")]
    BadTag { expected: u8, found: u8 },
    #[error("shape mismatch: stream holds {found}, layer is {expected}")]
    ShapeMismatch { expected: Shape, found: Shape },
    #[error("corrupt record: {0}")]
    Corrupt(String),
}
