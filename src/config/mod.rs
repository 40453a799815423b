//! Simulation configuration.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (prefix `GOSSIP_`)
//! - CLI arguments (applied by the binary on top of the above)
//!
//! All knobs are validated before any setup work happens; a bad value
//! rejects the whole run with no partial state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::protocol::ProtocolKind;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Population size.
    pub num_agents: usize,

    /// Round budget. The engine runs exactly this many rounds; there is no
    /// dynamic termination condition.
    pub max_rounds: u64,

    /// Which consensus update rule to run.
    #[serde(default)]
    pub protocol: ProtocolKind,

    /// RNG seed for reproducible runs. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Erdős–Rényi edge probability for the generated topology.
    #[serde(default = "default_edge_probability")]
    pub edge_probability: f64,

    /// Fault-injection knobs.
    #[serde(default)]
    pub faults: FaultConfig,

    /// Local-Voting knobs.
    #[serde(default)]
    pub local_voting: LocalVotingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_agents: 10,
            max_rounds: 100,
            protocol: ProtocolKind::default(),
            seed: None,
            edge_probability: default_edge_probability(),
            faults: FaultConfig::default(),
            local_voting: LocalVotingConfig::default(),
        }
    }
}

fn default_edge_probability() -> f64 {
    0.25
}

/// Fault-injection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Per-agent, per-round probability of a transient disconnection.
    pub disconnect_probability: f64,

    /// Upper bound on the silent-round counter drawn at disconnection.
    pub max_disconnect_rounds: u32,

    /// Standard deviation of the zero-mean Gaussian measurement noise
    /// applied per successful Local-Voting update.
    pub noise_std_dev: f64,

    /// Minimum Local-Voting delivery delay in rounds.
    pub min_delay: u32,

    /// Maximum Local-Voting delivery delay in rounds.
    pub max_delay: u32,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            disconnect_probability: 0.10,
            max_disconnect_rounds: 2,
            noise_std_dev: 0.1,
            min_delay: 1,
            max_delay: 2,
        }
    }
}

impl FaultConfig {
    /// A configuration with every fault channel switched off and delivery
    /// fixed at one round.
    pub fn none() -> Self {
        Self {
            disconnect_probability: 0.0,
            max_disconnect_rounds: 1,
            noise_std_dev: 0.0,
            min_delay: 1,
            max_delay: 1,
        }
    }
}

/// Local-Voting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVotingConfig {
    /// Damping gain applied to the summed neighbor differences. Must lie
    /// in (0, 1); small values converge slowly, large values can diverge.
    /// A tunable, not an engine-enforced convergence guarantee.
    pub step_size: f64,
}

impl Default for LocalVotingConfig {
    fn default() -> Self {
        Self { step_size: 0.05 }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SimError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| SimError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration overrides from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GOSSIP_NUM_AGENTS") {
            if let Ok(val) = val.parse() {
                config.num_agents = val;
            }
        }
        if let Ok(val) = std::env::var("GOSSIP_MAX_ROUNDS") {
            if let Ok(val) = val.parse() {
                config.max_rounds = val;
            }
        }
        if let Ok(val) = std::env::var("GOSSIP_PROTOCOL") {
            if let Ok(val) = val.parse() {
                config.protocol = val;
            }
        }
        if let Ok(val) = std::env::var("GOSSIP_SEED") {
            if let Ok(val) = val.parse() {
                config.seed = Some(val);
            }
        }
        if let Ok(val) = std::env::var("GOSSIP_EDGE_PROBABILITY") {
            if let Ok(val) = val.parse() {
                config.edge_probability = val;
            }
        }
        if let Ok(val) = std::env::var("GOSSIP_STEP_SIZE") {
            if let Ok(val) = val.parse() {
                config.local_voting.step_size = val;
            }
        }

        config
    }

    /// Merge with another config (other takes precedence where it differs
    /// from the defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = Self::default();
        Self {
            num_agents: if other.num_agents != defaults.num_agents {
                other.num_agents
            } else {
                self.num_agents
            },
            max_rounds: if other.max_rounds != defaults.max_rounds {
                other.max_rounds
            } else {
                self.max_rounds
            },
            protocol: if other.protocol != defaults.protocol {
                other.protocol
            } else {
                self.protocol
            },
            seed: other.seed.or(self.seed),
            edge_probability: if (other.edge_probability - defaults.edge_probability).abs()
                > f64::EPSILON
            {
                other.edge_probability
            } else {
                self.edge_probability
            },
            faults: other.faults,
            local_voting: other.local_voting,
        }
    }

    /// Reject invalid configurations before any setup work.
    pub fn validate(&self) -> Result<()> {
        if self.num_agents == 0 {
            return Err(SimError::Config("num_agents must be positive".into()));
        }
        if self.max_rounds == 0 {
            return Err(SimError::Config("max_rounds must be positive".into()));
        }
        if !(self.edge_probability > 0.0 && self.edge_probability <= 1.0) {
            return Err(SimError::Config(format!(
                "edge_probability must lie in (0, 1], got {}",
                self.edge_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.faults.disconnect_probability) {
            return Err(SimError::Config(format!(
                "disconnect_probability must lie in [0, 1], got {}",
                self.faults.disconnect_probability
            )));
        }
        if self.faults.max_disconnect_rounds == 0 {
            return Err(SimError::Config(
                "max_disconnect_rounds must be positive".into(),
            ));
        }
        if self.faults.noise_std_dev < 0.0 || self.faults.noise_std_dev.is_nan() {
            return Err(SimError::Config(format!(
                "noise_std_dev must be non-negative, got {}",
                self.faults.noise_std_dev
            )));
        }
        if self.faults.min_delay == 0 || self.faults.min_delay > self.faults.max_delay {
            return Err(SimError::Config(format!(
                "delay range must satisfy 1 <= min <= max, got [{}, {}]",
                self.faults.min_delay, self.faults.max_delay
            )));
        }
        if !(self.local_voting.step_size > 0.0 && self.local_voting.step_size < 1.0) {
            return Err(SimError::Config(format!(
                "step_size must lie in (0, 1), got {}",
                self.local_voting.step_size
            )));
        }
        Ok(())
    }
}
