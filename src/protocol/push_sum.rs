//! Push-Sum protocol: halve-and-forward mass redistribution.
//!
//! Each connected agent halves its `(s, w)` pair in place every round and
//! transmits one half to a uniformly random neighbor; the retained half
//! plus whatever arrives that round is folded in during the update phase.
//! Total mass (`Σs`, `Σw`) is conserved across every round boundary, which
//! the engine checks as an invariant.
//!
//! Disconnection handling keeps conservation intact: a silent agent
//! performs no halving (mass preserved, not lost) and does not fold its
//! accumulator, so in-flight mass parks in the accumulator until the agent
//! resumes. In-flight messages sent before the disconnection are still
//! delivered to their recipients.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::agent::Agent;
use crate::protocol::{Outgoing, ProtocolState};

/// Cost-ledger operation weight of one send: two halvings, a neighbor
/// draw and the accumulator additions on the receiving side.
pub const SEND_OPS: u32 = 8;

/// Send phase for one agent.
///
/// Halves `s` and `w` in place and emits the halves toward one random
/// neighbor. Returns `None` for a disconnected or isolated agent, which
/// also skips the halving.
pub fn send(agent: &mut Agent, rng: &mut impl Rng) -> Option<Outgoing> {
    if agent.is_disconnected() || agent.neighbors.is_empty() {
        return None;
    }
    let target = *agent.neighbors.choose(rng)?;

    match &mut agent.state {
        ProtocolState::PushSum { s, w, .. } => {
            *s /= 2.0;
            *w /= 2.0;
            Some(Outgoing::PushSum {
                target,
                s: *s,
                w: *w,
            })
        },
        ProtocolState::LocalVoting { .. } => None,
    }
}

/// Accumulate an inbound `(s, w)` pair.
///
/// Multiple arrivals within one round stack additively before the update
/// phase folds them in. Arrivals keep accumulating while the receiver is
/// disconnected; they fold at its first update after resuming.
pub fn receive(agent: &mut Agent, s_in: f64, w_in: f64) {
    if let ProtocolState::PushSum { inbox_s, inbox_w, .. } = &mut agent.state {
        *inbox_s += s_in;
        *inbox_w += w_in;
    }
}

/// Update phase for one agent: fold the accumulator into `(s, w)`.
///
/// A disconnected agent only decrements its silence counter; its
/// accumulator and shares stay untouched until it resumes.
pub fn update(agent: &mut Agent) {
    if agent.is_disconnected() {
        agent.disconnected_rounds -= 1;
        return;
    }
    if let ProtocolState::PushSum {
        s,
        w,
        inbox_s,
        inbox_w,
    } = &mut agent.state
    {
        *s += *inbox_s;
        *w += *inbox_w;
        *inbox_s = 0.0;
        *inbox_w = 0.0;
    }
}
