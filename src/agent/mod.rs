//! Agents and their per-round mailboxes.
//!
//! An [`Agent`] owns its protocol state exclusively. Neighbor relationships
//! are non-owning [`AgentId`] references into the population vector, kept
//! symmetric by construction: if A lists B then B lists A.
//!
//! The [`Mailbox`] implements delayed delivery for Local-Voting as a small
//! ring buffer of depth `max_delay + 1` indexed by `round % depth`, rather
//! than a map keyed by arrival round. Delivery semantics are identical, but
//! key growth is bounded: a slot whose round has passed is reclaimed either
//! by the end-of-round prune pass or when it is next written.

use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolState;

/// Agent identifier, a stable index into the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent#{}", self.0)
    }
}

/// One ring slot: the round its contents become visible, plus the payloads.
#[derive(Debug, Clone, Default)]
struct Slot {
    round: u64,
    values: Vec<f64>,
}

/// Round-keyed delivery buffer with fixed depth.
///
/// Invariant: entries for rounds strictly less than the current round never
/// persist. Consumed slots are cleared on [`Mailbox::take`]; unconsumed
/// slots are cleared by [`Mailbox::prune`] at the end of their round.
#[derive(Debug, Clone)]
pub struct Mailbox {
    slots: Vec<Slot>,
}

impl Mailbox {
    /// Create a mailbox able to hold deliveries up to `max_delay` rounds out.
    pub fn new(max_delay: u32) -> Self {
        let depth = max_delay as usize + 1;
        Self {
            slots: vec![Slot::default(); depth],
        }
    }

    /// Enqueue a payload for visibility at `arrival_round`.
    ///
    /// Reclaims the slot if it still holds a stale (already passed) round.
    pub fn deposit(&mut self, arrival_round: u64, value: f64) {
        let depth = self.slots.len() as u64;
        let slot = &mut self.slots[(arrival_round % depth) as usize];
        if slot.round != arrival_round {
            slot.values.clear();
            slot.round = arrival_round;
        }
        slot.values.push(value);
    }

    /// Drain the payloads visible at `round`. Empty if nothing arrived.
    pub fn take(&mut self, round: u64) -> Vec<f64> {
        let depth = self.slots.len() as u64;
        let slot = &mut self.slots[(round % depth) as usize];
        if slot.round == round {
            slot.round = 0;
            std::mem::take(&mut slot.values)
        } else {
            Vec::new()
        }
    }

    /// Delete the slot for `round`, consumed or not.
    ///
    /// Called after every update phase so that a round missed by a
    /// disconnected receiver cannot be "caught up" later.
    pub fn prune(&mut self, round: u64) {
        let depth = self.slots.len() as u64;
        let slot = &mut self.slots[(round % depth) as usize];
        if slot.round == round {
            slot.round = 0;
            slot.values.clear();
        }
    }

    /// Whether any payloads are queued for `round`.
    pub fn contains(&self, round: u64) -> bool {
        let depth = self.slots.len() as u64;
        let slot = &self.slots[(round % depth) as usize];
        slot.round == round && !slot.values.is_empty()
    }
}

/// One simulated agent: identity, neighborhood, fault state and protocol
/// state.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Stable identifier, equal to this agent's index in the population.
    pub id: AgentId,
    /// Symmetric, non-owning neighbor references.
    pub neighbors: Vec<AgentId>,
    /// Remaining rounds of forced silence; zero means connected.
    pub disconnected_rounds: u32,
    /// Protocol-specific state.
    pub state: ProtocolState,
}

impl Agent {
    /// Create an agent with the given protocol state and no neighbors yet.
    pub fn new(id: AgentId, state: ProtocolState) -> Self {
        Self {
            id,
            neighbors: Vec::new(),
            disconnected_rounds: 0,
            state,
        }
    }

    /// Whether the agent is currently silenced by a transient disconnection.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected_rounds > 0
    }

    /// The agent's current estimate of the population average.
    pub fn estimate(&self) -> f64 {
        self.state.estimate()
    }

    /// The Local-Voting mailbox, if this agent runs Local-Voting.
    pub fn mailbox(&self) -> Option<&Mailbox> {
        match &self.state {
            ProtocolState::LocalVoting { mailbox, .. } => Some(mailbox),
            ProtocolState::PushSum { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_take() {
        let mut mb = Mailbox::new(2);
        mb.deposit(3, 1.5);
        mb.deposit(3, 2.5);
        mb.deposit(4, 9.0);

        assert_eq!(mb.take(3), vec![1.5, 2.5]);
        assert_eq!(mb.take(3), Vec::<f64>::new());
        assert_eq!(mb.take(4), vec![9.0]);
    }

    #[test]
    fn test_take_absent_round_is_empty() {
        let mut mb = Mailbox::new(2);
        mb.deposit(5, 1.0);
        assert!(mb.take(7).is_empty());
        // The round-5 payload still sits in its slot until reclaimed.
        assert!(mb.contains(5));
    }

    #[test]
    fn test_prune_discards_unconsumed_slot() {
        let mut mb = Mailbox::new(2);
        mb.deposit(2, 4.0);
        assert!(mb.contains(2));
        mb.prune(2);
        assert!(!mb.contains(2));
        assert!(mb.take(2).is_empty());
    }

    #[test]
    fn test_stale_slot_reclaimed_on_deposit() {
        let mut mb = Mailbox::new(2);
        // Depth 3: rounds 2 and 5 share a slot.
        mb.deposit(2, 1.0);
        mb.deposit(5, 2.0);
        assert!(!mb.contains(2));
        assert_eq!(mb.take(5), vec![2.0]);
    }

    #[test]
    fn test_agent_starts_connected() {
        let agent = Agent::new(AgentId(0), ProtocolState::push_sum(10.0));
        assert!(!agent.is_disconnected());
        assert!(agent.neighbors.is_empty());
    }
}
