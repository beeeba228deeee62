//! Sample schema shipped with the `confbind` binary

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhysicsOptions {
    pub diffusion: bool,
    pub convection: bool,
    pub radiation: bool,
    pub flags: [i32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepOptions {
    pub time_step: f64,
    pub total_time: f64,
    pub output_frequency: i32,
    /// Random seed; drawn at startup when unset
    pub seed: Option<u64>,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            total_time: 10.0,
            output_frequency: 1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputOptions {
    pub directory: String,
    pub format: String,
    pub save_plots: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            format: "hdf5".to_string(),
            save_plots: false,
        }
    }
}

/// A snapshot written at a fixed simulation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Checkpoint {
    pub time: f64,
    pub label: String,
}

/// A simulation run: free-form metadata, three option groups, checkpoints
/// and user labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimulationConfig {
    pub description: String,
    pub author: String,
    pub physics: PhysicsOptions,
    pub simulation: StepOptions,
    pub output: OutputOptions,
    pub checkpoints: Vec<Checkpoint>,
    pub labels: BTreeMap<String, String>,
}
