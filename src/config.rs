use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    ExportErr, Result,
    pinn::{
        BlackScholes, TrainSettings,
        optimization::{Adam, GradientDescent, Optimizer},
    },
    verification::DEFAULT_TOLERANCE,
};

/// The `pinn-export` run configuration, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub export_dir: PathBuf,
    pub tolerance: f32,
    /// Fixed `[S, t]` inputs the exported artifact is checked on.
    pub probes: Vec<Vec<f32>>,
    pub network: NetworkConfig,
    pub black_scholes: BlackScholes,
    pub training: TrainingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.safetensors"),
            export_dir: PathBuf::from("weights"),
            tolerance: DEFAULT_TOLERANCE,
            probes: vec![vec![15.0, 0.5]],
            network: NetworkConfig::default(),
            black_scholes: BlackScholes::default(),
            training: TrainingConfig::default(),
        }
    }
}

/// The network topology: `input -> hidden x hidden_layers -> output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub hidden_layers: usize,
    pub output_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: 2,
            hidden_size: 64,
            hidden_layers: 2,
            output_size: 1,
        }
    }
}

impl NetworkConfig {
    /// Widths of every layer boundary, `[2, 64, 64, 1]` by default.
    pub fn dims(&self) -> Vec<usize> {
        std::iter::once(self.input_size)
            .chain(std::iter::repeat_n(self.hidden_size, self.hidden_layers))
            .chain(std::iter::once(self.output_size))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub samples: usize,
    pub seed: u64,
    pub log_every: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 2000,
            batch_size: 256,
            samples: 4096,
            seed: 42,
            log_every: 100,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn settings(&self) -> TrainSettings {
        TrainSettings {
            epochs: self.epochs,
            batch_size: self.batch_size,
            samples: self.samples,
            log_every: self.log_every,
        }
    }
}

/// The optimizer every parameter tensor is trained with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// `OptimizerConfig` built for one parameter tensor.
#[derive(Debug, Clone)]
pub enum ConfiguredOptimizer {
    Adam(Adam),
    GradientDescent(GradientDescent),
}

impl OptimizerConfig {
    /// Builds the optimizer for a parameter tensor of `len` elements.
    pub fn build(&self, len: usize) -> ConfiguredOptimizer {
        match *self {
            Self::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => ConfiguredOptimizer::Adam(Adam::new(len, learning_rate, beta1, beta2, epsilon)),
            Self::GradientDescent { learning_rate } => {
                ConfiguredOptimizer::GradientDescent(GradientDescent::new(learning_rate))
            }
        }
    }

    fn learning_rate(&self) -> f32 {
        match *self {
            Self::Adam { learning_rate, .. } | Self::GradientDescent { learning_rate } => {
                learning_rate
            }
        }
    }
}

impl Optimizer for ConfiguredOptimizer {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        match self {
            Self::Adam(adam) => adam.update_params(params, grad),
            Self::GradientDescent(gd) => gd.update_params(params, grad),
        }
    }
}

impl Config {
    /// Reads and validates a config file.
    ///
    /// # Arguments
    /// * `path` - A JSON file, where every missing field takes its default.
    ///
    /// # Returns
    /// The config or an error if it can't be read, parsed or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ExportErr::io(path, e))?;
        let config: Config = serde_json::from_str(&content).map_err(|e| ExportErr::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate().map_err(|reason| ExportErr::Config {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    /// Checks every value a run depends on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let net = &self.network;
        if net.input_size == 0 || net.output_size == 0 {
            return Err("network sizes must not be zero".into());
        }
        if net.hidden_layers > 0 && net.hidden_size == 0 {
            return Err("hidden_size must not be zero".into());
        }

        if self.training.batch_size == 0 {
            return Err("batch_size must not be zero".into());
        }
        let lr = self.training.optimizer.learning_rate();
        if lr.is_nan() || lr <= 0.0 {
            return Err("learning_rate must be positive".into());
        }

        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }

        if self.probes.is_empty() {
            return Err("probes must not be empty".into());
        }
        if let Some(p) = self.probes.iter().find(|p| p.len() != net.input_size) {
            return Err(format!(
                "probe {p:?} has {} values, expected {}",
                p.len(),
                net.input_size
            ));
        }

        let bs = &self.black_scholes;
        for (name, v) in [
            ("strike", bs.strike),
            ("volatility", bs.volatility),
            ("maturity", bs.maturity),
            ("s_max", bs.s_max),
        ] {
            if v.is_nan() || v <= 0.0 {
                return Err(format!("{name} must be positive, got {v}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_reference_config() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.network.dims(), [2, 64, 64, 1]);
        assert_eq!(config.probes, [vec![15.0, 0.5]]);
        assert_eq!(config.tolerance, 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_their_other_defaults() {
        let json = r#"{
            "network": { "hidden_size": 8 },
            "training": { "epochs": 3, "optimizer": { "gradient_descent": { "learning_rate": 0.01 } } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.network.dims(), [2, 8, 8, 1]);
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, 256);
        assert_eq!(
            config.training.optimizer,
            OptimizerConfig::GradientDescent {
                learning_rate: 0.01
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases: [fn(&mut Config); 7] = [
            |c| c.probes.clear(),
            |c| c.probes = vec![vec![15.0]],
            |c| c.tolerance = 0.0,
            |c| c.training.batch_size = 0,
            |c| c.network.hidden_size = 0,
            |c| c.black_scholes.volatility = -0.2,
            |c| c.black_scholes.maturity = f32::NAN,
        ];

        for (i, case) in cases.into_iter().enumerate() {
            let mut config = Config::default();
            case(&mut config);
            assert!(config.validate().is_err(), "case {i}");
        }
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "probes": [] }"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ExportErr::Config { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn optimizer_is_built_per_tensor() {
        let mut params = [1.0f32];
        let mut opt = OptimizerConfig::GradientDescent { learning_rate: 0.5 }.build(1);

        opt.update_params(&mut params, &[1.0]).unwrap();
        assert_eq!(params, [0.5]);
    }
}
