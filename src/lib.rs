//! # Gossip Core - Average-Consensus Simulation Engine
//!
//! Round-based simulation of gossip average-consensus protocols over a
//! randomly generated connected graph. Each agent holds a private scalar;
//! repeated rounds of local message exchange drive every agent's estimate
//! toward the population average without any agent ever seeing the global
//! value.
//!
//! ## Features
//!
//! - **Two update rules**: Push-Sum (exact mass redistribution) and
//!   Local-Voting (damped agreement over delayed values)
//! - **Fault injection**: transient disconnection, 1-2 round delivery
//!   delay, zero-mean Gaussian measurement noise
//! - **Deterministic replay**: a single seeded RNG threads through
//!   topology, faults and protocol choices
//! - **Cost accounting**: memory, operation and message counters as a pure
//!   side channel
//!
//! ## Architecture
//!
//! ```text
//! SimConfig ──> Topology Provider ──> Simulation setup
//!                 (Erdős–Rényi,          (agents, neighbors,
//!                  retry until            initial values,
//!                  connected)             cost ledger)
//!                                             │
//!                            per round  ┌─────v──────┐
//!                            1..=R      │ fault pass │
//!                                       │ send pass  │──> Outgoing batch
//!                                       │ delivery   │<── into mailboxes
//!                                       │ update     │
//!                                       │ prune      │
//!                                       │ invariants │
//!                                       └─────┬──────┘
//!                                             │
//!                                       FinalReport
//! ```
//!
//! ## Protocols
//!
//! | Protocol      | State        | Delivery        | Faults honored              |
//! |---------------|--------------|-----------------|-----------------------------|
//! | `PushSum`     | `(s, w)`     | same round      | disconnection               |
//! | `LocalVoting` | `val` + gain | 1-2 round delay | disconnection, delay, noise |
//!
//! Push-Sum conserves total mass (`Σs`, `Σw`) across every round boundary;
//! the engine verifies this, along with weight non-negativity, as a fatal
//! invariant. Local-Voting tolerates missed deliveries as defined no-ops
//! and prunes every mailbox slot the moment its round has passed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gossip::{run, ProtocolKind, SimConfig};
//!
//! let config = SimConfig {
//!     num_agents: 10,
//!     max_rounds: 100,
//!     protocol: ProtocolKind::PushSum,
//!     seed: Some(42),
//!     ..SimConfig::default()
//! };
//!
//! let report = run(config).unwrap();
//! println!("true average: {:.4}", report.true_average);
//! for (i, estimate) in report.estimates.iter().enumerate() {
//!     println!("agent {i}: {estimate:.4}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: round scheduler, simulation setup, final report
//! - [`protocol`]: Push-Sum and Local-Voting update rules
//! - [`agent`]: agent state and the ring-buffer mailbox
//! - [`faults`]: injected-fault model
//! - [`topology`]: connected-graph provider
//! - [`cost`]: cost accounting side channel
//! - [`config`]: configuration management
//! - [`error`]: error types and result alias

pub mod agent;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod faults;
pub mod protocol;
pub mod topology;

// Re-exports for convenience
pub use agent::{Agent, AgentId, Mailbox};
pub use config::{FaultConfig, LocalVotingConfig, SimConfig};
pub use cost::{CostLedger, CostSummary};
pub use engine::{run, FinalReport, Simulation};
pub use error::{Result, SimError};
pub use faults::FaultInjector;
pub use protocol::{ProtocolKind, ProtocolState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
