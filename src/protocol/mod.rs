//! Consensus protocol variants and the surface the scheduler drives.
//!
//! Two interchangeable update rules are supported:
//!
//! | Protocol      | Delivery        | Faults honored              |
//! |---------------|-----------------|-----------------------------|
//! | `PushSum`     | same round      | disconnection               |
//! | `LocalVoting` | 1-2 round delay | disconnection, delay, noise |
//!
//! Both expose the same three operations to the round scheduler: a send
//! that turns local state into [`Outgoing`] messages, an update that folds
//! arrived messages back into local state, and an estimate of the
//! population average. The scheduler stays protocol-agnostic; it matches on
//! [`ProtocolKind`] only to route into the right variant.
//!
//! Push-Sum is exact arithmetic by design: the pair `(s, w)` is halved and
//! redistributed but never estimated, so total mass is conserved and no
//! measurement noise applies. Local-Voting nudges a single value toward
//! recently received neighbor values, damped by a step-size gain, and is
//! subject to the full fault model.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, Mailbox};

pub mod local_voting;
pub mod push_sum;

/// Which consensus update rule a simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    /// Halve-and-forward mass redistribution; ratio `s / w` converges to
    /// the average.
    #[default]
    PushSum,
    /// Damped local agreement over delayed neighbor values.
    LocalVoting,
}

impl ProtocolKind {
    /// Per-agent state fields held by this protocol, for memory accounting.
    ///
    /// Push-Sum stores id, `s` and `w`; Local-Voting stores id and `val`.
    pub fn state_fields(self) -> usize {
        match self {
            Self::PushSum => 3,
            Self::LocalVoting => 2,
        }
    }
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PushSum => write!(f, "push-sum"),
            Self::LocalVoting => write!(f, "local-voting"),
        }
    }
}

impl std::str::FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "push-sum" | "pushsum" => Ok(Self::PushSum),
            "local-voting" | "localvoting" | "lvp" => Ok(Self::LocalVoting),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

/// Protocol-specific per-agent state.
#[derive(Debug, Clone)]
pub enum ProtocolState {
    /// Push-Sum mass shares plus the synchronous inbound accumulator.
    ///
    /// The accumulator replaces a round-keyed mailbox: Push-Sum delivers
    /// within the sending round, so arrivals only ever stack additively
    /// until the same round's update folds them in.
    PushSum {
        /// Sum share, seeded with the agent's initial value.
        s: f64,
        /// Weight share, seeded with `1.0`. Never negative.
        w: f64,
        /// Accumulated inbound sum shares for the current round.
        inbox_s: f64,
        /// Accumulated inbound weight shares for the current round.
        inbox_w: f64,
    },
    /// Local-Voting estimate plus its delayed-delivery mailbox.
    LocalVoting {
        /// Current value estimate, seeded with the agent's initial value.
        val: f64,
        /// Damping gain in (0, 1). A tunable, not an enforced invariant:
        /// too large a gain diverges, the engine does not police it.
        step_size: f64,
        /// Round-keyed delivery buffer.
        mailbox: Mailbox,
    },
}

impl ProtocolState {
    /// Fresh Push-Sum state for an agent holding `initial_value`.
    pub fn push_sum(initial_value: f64) -> Self {
        Self::PushSum {
            s: initial_value,
            w: 1.0,
            inbox_s: 0.0,
            inbox_w: 0.0,
        }
    }

    /// Fresh Local-Voting state for an agent holding `initial_value`.
    pub fn local_voting(initial_value: f64, step_size: f64, max_delay: u32) -> Self {
        Self::LocalVoting {
            val: initial_value,
            step_size,
            mailbox: Mailbox::new(max_delay),
        }
    }

    /// Current estimate of the population average.
    ///
    /// Push-Sum returns `s / w`, with a defined fallback of `0.0` when the
    /// weight share is zero; the estimate is only meaningful after at least
    /// one full send+update round. Local-Voting returns the value itself.
    pub fn estimate(&self) -> f64 {
        match self {
            Self::PushSum { s, w, .. } => {
                if *w == 0.0 {
                    0.0
                } else {
                    s / w
                }
            },
            Self::LocalVoting { val, .. } => *val,
        }
    }
}

/// A message emitted during a send phase, delivered before the update phase.
///
/// Send phases only read the sender; delivery only writes the target's
/// mailbox or accumulator. Batching sends this way realizes the
/// write-only-during-send, read-only-during-update mailbox discipline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Half of a Push-Sum agent's mass, bound for one random neighbor's
    /// accumulator in the same round.
    PushSum {
        /// Receiving agent.
        target: AgentId,
        /// Transmitted sum share.
        s: f64,
        /// Transmitted weight share.
        w: f64,
    },
    /// A Local-Voting value bound for a neighbor's mailbox one or two
    /// rounds out.
    LocalVoting {
        /// Receiving agent.
        target: AgentId,
        /// Round at which the payload becomes visible to the target.
        arrival_round: u64,
        /// The sender's value at send time.
        value: f64,
    },
}
