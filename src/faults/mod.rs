//! Injected-fault model: transient disconnection, delivery delay and
//! measurement noise.
//!
//! All three processes are independent and drawn from the explicit RNG the
//! engine threads through every call, so a seeded run replays exactly. The
//! injector itself is stateless; disconnection state lives on the agent as
//! a counter of remaining silent rounds.
//!
//! Push-Sum runs share the same injector but only the disconnection process
//! applies to them; delay and noise are Local-Voting-only by design.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::agent::Agent;
use crate::config::FaultConfig;
use crate::error::{Result, SimError};

/// Per-agent, per-round fault decisions.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    config: FaultConfig,
    noise: Normal<f64>,
}

impl FaultInjector {
    /// Build an injector from a validated fault configuration.
    pub fn new(config: FaultConfig) -> Result<Self> {
        let noise = Normal::new(0.0, config.noise_std_dev)
            .map_err(|e| SimError::Config(format!("invalid noise distribution: {e}")))?;
        Ok(Self { config, noise })
    }

    /// Fault-injection pass for one agent.
    ///
    /// A connected agent is silenced with probability
    /// `disconnect_probability` for a uniform number of rounds in
    /// `[1, max_disconnect_rounds]`. An already-silent agent is left alone;
    /// its counter decrements during the update phase, and at zero the
    /// agent resumes with its last-known state untouched.
    pub fn maybe_disconnect(&self, agent: &mut Agent, rng: &mut impl Rng) {
        if self.config.disconnect_probability <= 0.0 || agent.is_disconnected() {
            return;
        }
        if rng.gen::<f64>() < self.config.disconnect_probability {
            agent.disconnected_rounds = rng.gen_range(1..=self.config.max_disconnect_rounds);
        }
    }

    /// Delivery delay in rounds for one Local-Voting message, uniform in
    /// `[min_delay, max_delay]`.
    pub fn sample_delay(&self, rng: &mut impl Rng) -> u64 {
        if self.config.min_delay == self.config.max_delay {
            return u64::from(self.config.min_delay);
        }
        u64::from(rng.gen_range(self.config.min_delay..=self.config.max_delay))
    }

    /// One zero-mean Gaussian measurement-noise sample.
    pub fn sample_noise(&self, rng: &mut impl Rng) -> f64 {
        if self.config.noise_std_dev <= 0.0 {
            return 0.0;
        }
        self.noise.sample(rng)
    }

    /// The configuration this injector was built from.
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::agent::AgentId;
    use crate::protocol::ProtocolState;

    fn agent() -> Agent {
        Agent::new(AgentId(0), ProtocolState::push_sum(1.0))
    }

    #[test]
    fn test_certain_disconnection() {
        let injector = FaultInjector::new(FaultConfig {
            disconnect_probability: 1.0,
            ..FaultConfig::default()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut agent = agent();

        injector.maybe_disconnect(&mut agent, &mut rng);
        assert!(agent.is_disconnected());
        assert!((1..=2).contains(&agent.disconnected_rounds));
    }

    #[test]
    fn test_zero_probability_never_disconnects() {
        let injector = FaultInjector::new(FaultConfig {
            disconnect_probability: 0.0,
            ..FaultConfig::default()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut agent = agent();

        for _ in 0..100 {
            injector.maybe_disconnect(&mut agent, &mut rng);
        }
        assert!(!agent.is_disconnected());
    }

    #[test]
    fn test_silent_agent_left_alone() {
        let injector = FaultInjector::new(FaultConfig {
            disconnect_probability: 1.0,
            ..FaultConfig::default()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut agent = agent();
        agent.disconnected_rounds = 2;

        injector.maybe_disconnect(&mut agent, &mut rng);
        assert_eq!(agent.disconnected_rounds, 2);
    }

    #[test]
    fn test_delay_stays_in_range() {
        let injector = FaultInjector::new(FaultConfig::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            let delay = injector.sample_delay(&mut rng);
            assert!((1..=2).contains(&delay));
        }
    }

    #[test]
    fn test_zero_std_dev_noise_is_exact() {
        let injector = FaultInjector::new(FaultConfig {
            noise_std_dev: 0.0,
            ..FaultConfig::default()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(injector.sample_noise(&mut rng), 0.0);
    }

    #[test]
    fn test_noise_is_roughly_zero_mean() {
        let injector = FaultInjector::new(FaultConfig::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mean: f64 = (0..10_000).map(|_| injector.sample_noise(&mut rng)).sum::<f64>() / 10_000.0;
        assert!(mean.abs() < 0.01);
    }
}
