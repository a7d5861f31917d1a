use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::pool::DEFAULT_THREADS;

// keeps swap_count (up to swaps_per_selection * populus) and the best weight count inside a u16
const MAX_POPULUS: usize = 16383;

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")))
    }
}

/// Tunables of the per-weight optimizer shared by every slot of an [`EvolvedLayer`](super::evolved_layer::EvolvedLayer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub populus: usize,
    pub base_switch_probability: f64,
    pub switch_gain: f64,
    pub max_switch_probability: f64,
    pub fitness_decay: f64,
    pub momentum_gain: f64,
    pub best_weight_reuse_probability: f64,
    pub selection_pressure: f64,
    pub swaps_per_selection: usize,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            populus: 16,
            base_switch_probability: 0.01,
            switch_gain: 0.0005,
            max_switch_probability: 0.25,
            fitness_decay: 0.1,
            momentum_gain: 0.0,
            best_weight_reuse_probability: 0.9,
            selection_pressure: 0.5,
            swaps_per_selection: 2,
        }
    }
}

impl Settings {
    pub fn with_populus(populus: usize) -> Settings {
        Settings { populus, ..Settings::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.populus == 0 || self.populus > MAX_POPULUS {
            return Err(ConfigError::Invalid(format!("populus must be within 1..={MAX_POPULUS}, got {}", self.populus)));
        }
        if self.swaps_per_selection == 0 || self.swaps_per_selection * self.populus > u16::MAX as usize {
            return Err(ConfigError::Invalid(format!("swaps_per_selection {} does not fit the swap counter", self.swaps_per_selection)));
        }
        check_probability("base_switch_probability", self.base_switch_probability)?;
        check_probability("max_switch_probability", self.max_switch_probability)?;
        check_probability("best_weight_reuse_probability", self.best_weight_reuse_probability)?;
        check_probability("selection_pressure", self.selection_pressure)?;
        if !self.switch_gain.is_finite() || !self.fitness_decay.is_finite() || !self.momentum_gain.is_finite() {
            return Err(ConfigError::Invalid("switch_gain, fitness_decay and momentum_gain must be finite".to_string()));
        }
        Ok(())
    }

    /// Number of swaps after which a slot runs a selection.
    pub fn swaps_to_selection(&self) -> usize {
        self.swaps_per_selection * self.populus
    }
}

/// Tunables of the neuron-granularity genetic variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSettings {
    pub populus: usize,
    pub working: usize,
    pub uses_to_mating: usize,
    pub mating_threshold: f64,
    pub keep_fraction: f64,
}

impl Default for PopulationSettings {
    fn default() -> PopulationSettings {
        PopulationSettings {
            populus: 10,
            working: 3,
            uses_to_mating: 4,
            mating_threshold: 0.5,
            keep_fraction: 0.3,
        }
    }
}

impl PopulationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.populus == 0 || self.populus > MAX_POPULUS {
            return Err(ConfigError::Invalid(format!("populus must be within 1..={MAX_POPULUS}, got {}", self.populus)));
        }
        if self.working == 0 {
            return Err(ConfigError::Invalid("working must be at least 1".to_string()));
        }
        if self.uses_to_mating == 0 || self.uses_to_mating > u16::MAX as usize {
            return Err(ConfigError::Invalid(format!("uses_to_mating must be within 1..={}, got {}", u16::MAX, self.uses_to_mating)));
        }
        check_probability("mating_threshold", self.mating_threshold)?;
        check_probability("keep_fraction", self.keep_fraction)?;
        Ok(())
    }

    pub fn mating_trigger(&self) -> f64 {
        self.mating_threshold * self.populus as f64
    }

    pub fn survivors(&self) -> usize {
        ((self.populus as f64 * self.keep_fraction) as usize).clamp(1, self.populus)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threads: usize,
    pub seed: Option<u64>,
    pub layer: Settings,
    pub population: PopulationSettings,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            threads: DEFAULT_THREADS,
            seed: None,
            layer: Settings::default(),
            population: PopulationSettings::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Config::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".to_string()));
        }
        self.layer.validate()?;
        self.population.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.threads, 4);
        assert_eq!(config.layer.base_switch_probability, 0.01);
        assert_eq!(config.population.uses_to_mating, 4);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml = r#"
            threads = 2
            seed = 7

            [layer]
            populus = 4
            momentum_gain = 0.5

            [population]
            working = 5
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.layer.populus, 4);
        assert_eq!(config.layer.momentum_gain, 0.5);
        assert_eq!(config.layer.switch_gain, 0.0005);
        assert_eq!(config.population.working, 5);
        assert_eq!(config.population.populus, 10);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(Config::from_toml_str("[layer]\npopulus = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::from_toml_str("[layer]\nselection_pressure = 1.5"), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::from_toml_str("[population]\nworking = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::from_toml_str("threads = 0"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(Config::from_toml_str("threads = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn survivors_never_drop_to_zero() {
        let settings = PopulationSettings { populus: 2, ..PopulationSettings::default() };
        assert_eq!(settings.survivors(), 1);
        assert_eq!(PopulationSettings::default().survivors(), 3);
    }
}
