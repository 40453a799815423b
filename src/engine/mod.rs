//! Round-based consensus simulation engine.
//!
//! Drives discrete rounds `1..=max_rounds` over the agent population in a
//! strict phase order; a phase never starts until the previous one has
//! completed for every agent:
//!
//! ```text
//! For each round r:
//! 1. Fault pass     - maybe_disconnect every agent
//! 2. Send pass      - every connected agent emits Outgoing messages
//! 3. Delivery       - batched messages land in mailboxes/accumulators
//! 4. Update pass    - every agent folds round-r arrivals into its state
//! 5. Prune pass     - round-r mailbox slots are deleted, consumed or not
//! 6. Invariant pass - Push-Sum mass conservation and weight checks
//! ```
//!
//! Agents mutate only their own state during the update pass and only
//! others' mailboxes during delivery, so any within-phase interleaving is
//! valid; this engine runs them sequentially in id order, which also keeps
//! a seeded run bit-reproducible.
//!
//! There is no dynamic termination: the round budget is the only stop
//! signal, after which [`Simulation::run`] exposes the final per-agent
//! estimates for verification.

use petgraph::graph::UnGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{Agent, AgentId};
use crate::config::SimConfig;
use crate::cost::{CostLedger, CostSummary};
use crate::error::{Result, SimError};
use crate::faults::FaultInjector;
use crate::protocol::{local_voting, push_sum, Outgoing, ProtocolKind, ProtocolState};
use crate::topology;

/// Relative tolerance for the Push-Sum mass-conservation check.
const MASS_EPSILON: f64 = 1e-6;

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Protocol that produced the estimates.
    pub protocol: ProtocolKind,
    /// Population size.
    pub num_agents: usize,
    /// Rounds executed (always the configured budget).
    pub rounds: u64,
    /// Private initial value of every agent, in id order.
    pub initial_values: Vec<f64>,
    /// Population mean of the initial values, hidden from agents during
    /// the run.
    pub true_average: f64,
    /// Final per-agent estimates, in id order.
    pub estimates: Vec<f64>,
    /// Largest absolute deviation of any estimate from the true average.
    pub max_error: f64,
    /// Mean absolute deviation of the estimates from the true average.
    pub mean_error: f64,
    /// Accrued simulation costs.
    pub cost: CostSummary,
}

/// A configured simulation ready to run.
pub struct Simulation {
    config: SimConfig,
    agents: Vec<Agent>,
    faults: FaultInjector,
    ledger: CostLedger,
    rng: StdRng,
    initial_values: Vec<f64>,
    true_average: f64,
    round: u64,
    // Push-Sum initial mass totals, the reference for conservation checks.
    total_s: f64,
    total_w: f64,
}

impl Simulation {
    /// Set up a simulation: validate the config, generate a connected
    /// topology, and seed agents with uniform random integer values in
    /// `[1, 100]`.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let graph =
            topology::generate_connected_graph(config.num_agents, config.edge_probability, &mut rng)?;
        let initial_values: Vec<f64> = (0..config.num_agents)
            .map(|_| f64::from(rng.gen_range(1..=100)))
            .collect();
        Self::with_topology_and_rng(config, &graph, initial_values, rng)
    }

    /// Set up a simulation over a caller-supplied topology and initial
    /// values, for deterministic scenarios.
    ///
    /// The graph must cover exactly `num_agents` nodes and be connected;
    /// both are checked here because the external provider contract no
    /// longer applies.
    pub fn with_topology(
        config: SimConfig,
        graph: &UnGraph<usize, ()>,
        initial_values: Vec<f64>,
    ) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_topology_and_rng(config, graph, initial_values, rng)
    }

    fn with_topology_and_rng(
        config: SimConfig,
        graph: &UnGraph<usize, ()>,
        initial_values: Vec<f64>,
        rng: StdRng,
    ) -> Result<Self> {
        if graph.node_count() != config.num_agents {
            return Err(SimError::Topology(format!(
                "graph covers {} nodes, config expects {}",
                graph.node_count(),
                config.num_agents
            )));
        }
        if !topology::is_connected(graph) {
            return Err(SimError::Topology("graph is not connected".into()));
        }
        if initial_values.len() != config.num_agents {
            return Err(SimError::Config(format!(
                "{} initial values for {} agents",
                initial_values.len(),
                config.num_agents
            )));
        }

        let faults = FaultInjector::new(config.faults.clone())?;
        let mut ledger = CostLedger::new();
        ledger.record_memory(config.num_agents, config.protocol.state_fields());

        let mut agents: Vec<Agent> = initial_values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let state = match config.protocol {
                    ProtocolKind::PushSum => ProtocolState::push_sum(value),
                    ProtocolKind::LocalVoting => ProtocolState::local_voting(
                        value,
                        config.local_voting.step_size,
                        config.faults.max_delay,
                    ),
                };
                Agent::new(AgentId(i), state)
            })
            .collect();

        // Symmetric neighbor lists from the undirected edge set.
        for (u, v) in topology::edge_pairs(graph) {
            agents[u].neighbors.push(AgentId(v));
            agents[v].neighbors.push(AgentId(u));
        }

        let true_average = initial_values.iter().sum::<f64>() / initial_values.len() as f64;
        let total_s = initial_values.iter().sum();
        let total_w = initial_values.len() as f64;

        info!(
            agents = config.num_agents,
            edges = graph.edge_count(),
            protocol = %config.protocol,
            true_average,
            "simulation ready"
        );

        Ok(Self {
            config,
            agents,
            faults,
            ledger,
            rng,
            initial_values,
            true_average,
            round: 0,
            total_s,
            total_w,
        })
    }

    /// The agent population, in id order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access to the population, for scripted fault scenarios.
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Rounds executed so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// The population mean of the initial values.
    pub fn true_average(&self) -> f64 {
        self.true_average
    }

    /// Execute one full round: faults, sends, delivery, updates, pruning,
    /// invariant checks.
    pub fn run_round(&mut self) -> Result<()> {
        self.round += 1;
        let round = self.round;

        // Phase a: fault injection.
        for agent in &mut self.agents {
            self.faults.maybe_disconnect(agent, &mut self.rng);
        }

        // Phase b: sends, batched so no mailbox is read while written.
        let mut batch: Vec<Outgoing> = Vec::new();
        for agent in &mut self.agents {
            match self.config.protocol {
                ProtocolKind::PushSum => {
                    if let Some(out) = push_sum::send(agent, &mut self.rng) {
                        self.ledger.record_operation(push_sum::SEND_OPS);
                        self.ledger.record_message();
                        batch.push(out);
                    }
                },
                ProtocolKind::LocalVoting => {
                    for out in local_voting::send(agent, round, &self.faults, &mut self.rng) {
                        self.ledger.record_message();
                        batch.push(out);
                    }
                },
            }
        }
        for out in batch {
            match out {
                Outgoing::PushSum { target, s, w } => {
                    push_sum::receive(&mut self.agents[target.0], s, w);
                },
                Outgoing::LocalVoting {
                    target,
                    arrival_round,
                    value,
                } => {
                    local_voting::deliver(&mut self.agents[target.0], arrival_round, value);
                },
            }
        }

        // Phase c: updates.
        for agent in &mut self.agents {
            match self.config.protocol {
                ProtocolKind::PushSum => push_sum::update(agent),
                ProtocolKind::LocalVoting => {
                    let consumed =
                        local_voting::update(agent, round, &self.faults, &mut self.rng);
                    if consumed > 0 {
                        let weight = u32::try_from(consumed * 2 + 2).unwrap_or(u32::MAX);
                        self.ledger.record_operation(weight);
                    }
                },
            }
        }

        // Prune round-r slots whether or not they were consumed, so a
        // missed delivery never lingers.
        if self.config.protocol == ProtocolKind::LocalVoting {
            for agent in &mut self.agents {
                if let ProtocolState::LocalVoting { mailbox, .. } = &mut agent.state {
                    mailbox.prune(round);
                }
            }
        }

        self.check_invariants()?;

        if round == 1 || round % 10 == 0 {
            let active = self.agents.iter().filter(|a| !a.is_disconnected()).count();
            info!(
                round,
                active,
                agents = self.agents.len(),
                mean_estimate = self.mean_estimate(),
                "round complete"
            );
        } else {
            debug!(round, "round complete");
        }
        Ok(())
    }

    /// Run the full round budget and produce the final report.
    pub fn run(mut self) -> Result<FinalReport> {
        for _ in 0..self.config.max_rounds {
            self.run_round()?;
        }

        let estimates: Vec<f64> = self.agents.iter().map(Agent::estimate).collect();
        let errors: Vec<f64> = estimates
            .iter()
            .map(|e| (e - self.true_average).abs())
            .collect();
        let max_error = errors.iter().fold(0.0_f64, |a, &b| a.max(b));
        let mean_error = errors.iter().sum::<f64>() / errors.len() as f64;

        info!(
            rounds = self.round,
            true_average = self.true_average,
            max_error,
            mean_error,
            cost = self.ledger.total(),
            "simulation finished"
        );

        Ok(FinalReport {
            protocol: self.config.protocol,
            num_agents: self.config.num_agents,
            rounds: self.round,
            initial_values: self.initial_values,
            true_average: self.true_average,
            estimates,
            max_error,
            mean_error,
            cost: self.ledger.summary(),
        })
    }

    fn mean_estimate(&self) -> f64 {
        self.agents.iter().map(Agent::estimate).sum::<f64>() / self.agents.len() as f64
    }

    /// Internal-consistency checks at the round boundary.
    ///
    /// Violations are engine defects, not fault-injection outcomes, and
    /// abort the run.
    fn check_invariants(&self) -> Result<()> {
        if self.config.protocol != ProtocolKind::PushSum {
            return Ok(());
        }

        let mut sum_s = 0.0;
        let mut sum_w = 0.0;
        for agent in &self.agents {
            if let ProtocolState::PushSum {
                s,
                w,
                inbox_s,
                inbox_w,
            } = &agent.state
            {
                if *w < 0.0 || *inbox_w < 0.0 {
                    return Err(SimError::Invariant(format!(
                        "negative weight at {} in round {}: w = {w}, inbox_w = {inbox_w}",
                        agent.id, self.round
                    )));
                }
                // In-flight mass parked at disconnected receivers still
                // counts toward the totals.
                sum_s += s + inbox_s;
                sum_w += w + inbox_w;
            }
        }

        let s_scale = self.total_s.abs().max(1.0);
        if (sum_s - self.total_s).abs() > MASS_EPSILON * s_scale {
            return Err(SimError::Invariant(format!(
                "sum mass drifted in round {}: expected {}, found {sum_s}",
                self.round, self.total_s
            )));
        }
        let w_scale = self.total_w.max(1.0);
        if (sum_w - self.total_w).abs() > MASS_EPSILON * w_scale {
            return Err(SimError::Invariant(format!(
                "weight mass drifted in round {}: expected {}, found {sum_w}",
                self.round, self.total_w
            )));
        }
        Ok(())
    }
}

/// Simulation entry point: build from config, run the round budget, return
/// the report. Everything is recreated per invocation; no state persists
/// between runs.
pub fn run(config: SimConfig) -> Result<FinalReport> {
    Simulation::new(config)?.run()
}
