//! Local-Voting protocol: damped agreement over delayed neighbor values.
//!
//! Each connected agent broadcasts its current value to every neighbor with
//! an independent per-message delay, then folds whatever arrives for the
//! current round:
//!
//! ```text
//! val += step_size * Σ(incoming - val) + noise
//! ```
//!
//! A round with no arrivals is a no-op: nothing is updated and no noise is
//! drawn. Missed deliveries are lost, never caught up; the engine prunes a
//! round's mailbox slot as soon as that round's update phase is over.

use rand::Rng;

use crate::agent::Agent;
use crate::faults::FaultInjector;
use crate::protocol::{Outgoing, ProtocolState};

/// Send phase for one agent: one delayed copy of `val` per neighbor.
///
/// Returns no messages for a disconnected agent. Delays are sampled
/// independently per message, so two neighbors may see the same broadcast
/// in different rounds.
pub fn send(
    agent: &Agent,
    round: u64,
    faults: &FaultInjector,
    rng: &mut impl Rng,
) -> Vec<Outgoing> {
    if agent.is_disconnected() {
        return Vec::new();
    }
    let val = match &agent.state {
        ProtocolState::LocalVoting { val, .. } => *val,
        ProtocolState::PushSum { .. } => return Vec::new(),
    };

    agent
        .neighbors
        .iter()
        .map(|&target| Outgoing::LocalVoting {
            target,
            arrival_round: round + faults.sample_delay(rng),
            value: val,
        })
        .collect()
}

/// Deliver one payload into the receiving agent's mailbox.
///
/// Delivery happens even if the sender has since disconnected; silence
/// only suppresses future sends, not messages already in flight.
pub fn deliver(agent: &mut Agent, arrival_round: u64, value: f64) {
    if let ProtocolState::LocalVoting { mailbox, .. } = &mut agent.state {
        mailbox.deposit(arrival_round, value);
    }
}

/// Update phase for one agent. Returns the number of messages consumed.
///
/// A disconnected agent decrements its silence counter and changes nothing
/// else. An empty mailbox slot is a no-op; in particular no noise sample is
/// drawn, so a quiet round leaves `val` bit-identical.
pub fn update(agent: &mut Agent, round: u64, faults: &FaultInjector, rng: &mut impl Rng) -> usize {
    if agent.is_disconnected() {
        agent.disconnected_rounds -= 1;
        return 0;
    }
    let ProtocolState::LocalVoting {
        val,
        step_size,
        mailbox,
    } = &mut agent.state
    else {
        return 0;
    };

    let incoming = mailbox.take(round);
    if incoming.is_empty() {
        return 0;
    }

    let diff_sum: f64 = incoming.iter().map(|v| v - *val).sum();
    let noise = faults.sample_noise(rng);
    *val += *step_size * diff_sum + noise;

    incoming.len()
}
