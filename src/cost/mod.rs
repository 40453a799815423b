//! Cost accounting for simulation runs.
//!
//! The ledger tallies three monotonically non-decreasing counters: a memory
//! cost fixed at setup (proportional to the population and per-agent state
//! size), an operation cost accrued per local update, and a message cost
//! accrued per message sent. It is a pure side channel consumed only by
//! reporting; protocol logic never reads it back.
//!
//! The ledger is an explicit object owned by the engine and surfaced in the
//! final report, not ambient global state, so the engine stays composable
//! and testable in isolation.

use serde::{Deserialize, Serialize};

/// Cost per stored state field.
pub const MEM_UNIT: f64 = 0.1;
/// Cost per counted arithmetic/assignment operation.
pub const OP_UNIT: f64 = 0.01;
/// Cost per transmitted message.
pub const MSG_UNIT: f64 = 0.01;

/// Append-only cost counters. Increments commute, so totals are
/// independent of accrual order.
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    memory: f64,
    operations: f64,
    messages: f64,
}

impl CostLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the fixed setup memory cost: `n_agents` agents each holding
    /// `fields_per_agent` state fields.
    pub fn record_memory(&mut self, n_agents: usize, fields_per_agent: usize) {
        self.memory += n_agents as f64 * fields_per_agent as f64 * MEM_UNIT;
    }

    /// Record one local update of the given operation weight.
    pub fn record_operation(&mut self, weight: u32) {
        self.operations += f64::from(weight) * OP_UNIT;
    }

    /// Record one message sent between agents.
    pub fn record_message(&mut self) {
        self.messages += MSG_UNIT;
    }

    /// Combined total across all three counters.
    pub fn total(&self) -> f64 {
        self.memory + self.operations + self.messages
    }

    /// Snapshot for reporting.
    pub fn summary(&self) -> CostSummary {
        CostSummary {
            memory: self.memory,
            operations: self.operations,
            messages: self.messages,
            total: self.total(),
        }
    }
}

/// Serializable cost breakdown included in the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Fixed setup memory cost.
    pub memory: f64,
    /// Accrued operation cost.
    pub operations: f64,
    /// Accrued message cost.
    pub messages: f64,
    /// Sum of the three counters.
    pub total: f64,
}
