//! Gossip consensus CLI binary.
//!
//! # Commands
//!
//! - `run` - Execute a simulation and print the final report
//! - `graph` - Generate a connected topology and dump its edge list

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gossip::{engine, topology, ProtocolKind, SimConfig, VERSION};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gossip")]
#[command(version = VERSION)]
#[command(about = "Gossip average-consensus simulation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a consensus simulation
    Run {
        /// Number of agents
        #[arg(short = 'n', long)]
        agents: Option<usize>,

        /// Round budget
        #[arg(short, long)]
        rounds: Option<u64>,

        /// Consensus protocol (push-sum, local-voting)
        #[arg(short, long)]
        protocol: Option<ProtocolKind>,

        /// RNG seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Erdős–Rényi edge probability
        #[arg(short, long)]
        edge_prob: Option<f64>,

        /// Local-Voting step size (damping gain)
        #[arg(long)]
        step_size: Option<f64>,

        /// Per-round disconnection probability
        #[arg(long)]
        disconnect_prob: Option<f64>,

        /// Measurement-noise standard deviation (Local-Voting)
        #[arg(long)]
        noise_std: Option<f64>,

        /// TOML config file; CLI flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output the full report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Generate a connected topology and print it
    Graph {
        /// Number of nodes
        #[arg(short = 'n', long, default_value = "10")]
        agents: usize,

        /// Erdős–Rényi edge probability
        #[arg(short, long, default_value = "0.25")]
        edge_prob: f64,

        /// RNG seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            agents,
            rounds,
            protocol,
            seed,
            edge_prob,
            step_size,
            disconnect_prob,
            noise_std,
            config,
            json,
        } => {
            let mut sim_config = SimConfig::from_env();
            if let Some(path) = config {
                let from_file = SimConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?;
                sim_config = sim_config.merge(from_file);
            }
            if let Some(n) = agents {
                sim_config.num_agents = n;
            }
            if let Some(r) = rounds {
                sim_config.max_rounds = r;
            }
            if let Some(p) = protocol {
                sim_config.protocol = p;
            }
            if let Some(s) = seed {
                sim_config.seed = Some(s);
            }
            if let Some(p) = edge_prob {
                sim_config.edge_probability = p;
            }
            if let Some(a) = step_size {
                sim_config.local_voting.step_size = a;
            }
            if let Some(p) = disconnect_prob {
                sim_config.faults.disconnect_probability = p;
            }
            if let Some(std) = noise_std {
                sim_config.faults.noise_std_dev = std;
            }

            let report = engine::run(sim_config).context("simulation failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        },

        Commands::Graph {
            agents,
            edge_prob,
            seed,
            json,
        } => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let graph = topology::generate_connected_graph(agents, edge_prob, &mut rng)
                .context("topology generation failed")?;
            let edges = topology::edge_pairs(&graph);

            if json {
                let out = json!({
                    "nodes": agents,
                    "edges": edges,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{} nodes, {} edges", agents, edges.len());
                for (u, v) in edges {
                    println!("{u} -- {v}");
                }
            }
        },
    }

    Ok(())
}

fn print_report(report: &engine::FinalReport) {
    println!(
        "Protocol: {} | {} agents | {} rounds",
        report.protocol, report.num_agents, report.rounds
    );
    println!("True average: {:.4}", report.true_average);
    println!("Agent estimates:");
    for (i, estimate) in report.estimates.iter().enumerate() {
        let diff = (estimate - report.true_average).abs();
        println!("  Agent {i:02}: {estimate:9.4} (diff: {diff:.6})");
    }
    println!(
        "Error: max {:.6}, mean {:.6}",
        report.max_error, report.mean_error
    );
    println!(
        "Cost: memory {:.4} + operations {:.4} + messages {:.4} = {:.4}",
        report.cost.memory, report.cost.operations, report.cost.messages, report.cost.total
    );
}
