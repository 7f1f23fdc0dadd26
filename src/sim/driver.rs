//! 仿真驱动：可激发集 → 调度 → 标识变更 → 记录，直到满足停止条件。
//!
//! 停止条件按固定顺序检查：取消、`clock ≥ horizon`、事件数上限、终止状态。
//! 每次运行独占自己的标识与随机数发生器，网只读共享，
//! 因此多个重复实验可以在 rayon 线程池上并行执行。
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::net::{Marking, Net};
use crate::sim::error::SimError;
use crate::sim::scheduler::{Decision, Scheduler};
use crate::sim::trajectory::{Recorder, Trajectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Horizon,
    MaxEvents,
    /// No transition can fire. A normal outcome.
    TerminalState,
    Cancelled,
}

/// Cooperative cancellation shared between a caller and running simulations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub trajectory: Trajectory,
    pub stop: StopReason,
    pub events: usize,
    pub final_time: f64,
    pub seed: u64,
}

impl RunOutcome {
    pub fn final_marking(&self) -> &Marking {
        self.trajectory.final_marking()
    }
}

pub struct Simulation<'net> {
    net: &'net Net,
    cancel: Option<CancelToken>,
}

impl<'net> Simulation<'net> {
    pub fn new(net: &'net Net) -> Result<Self, SimError> {
        if !net.is_frozen() {
            return Err(SimError::NotFrozen);
        }
        Ok(Self { net, cancel: None })
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn net(&self) -> &'net Net {
        self.net
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Single run seeded from `config.seed`.
    pub fn run(&self, initial: &Marking, config: &RunConfig) -> Result<RunOutcome, SimError> {
        self.run_seeded(initial, config, config.seed)
    }

    pub fn run_seeded(
        &self,
        initial: &Marking,
        config: &RunConfig,
        seed: u64,
    ) -> Result<RunOutcome, SimError> {
        config.validate()?;
        let net = self.net;
        if initial.len() != net.places_len() {
            return Err(SimError::MarkingMismatch {
                expected: net.places_len(),
                found: initial.len(),
            });
        }
        let mut scheduler = Scheduler::new(net, config.policy)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut marking = initial.clone();
        let mut recorder = Recorder::new(net, config.snapshot, &marking);
        let mut clock = 0.0_f64;
        let mut events = 0usize;

        debug!(
            "run start: seed={seed} policy={} horizon={:?} max_events={}",
            config.policy.name(),
            config.horizon,
            config.max_events
        );

        let stop = loop {
            if self.cancelled() {
                break StopReason::Cancelled;
            }
            if config.horizon.is_some_and(|h| clock >= h) {
                break StopReason::Horizon;
            }
            if events >= config.max_events {
                break StopReason::MaxEvents;
            }
            let (transition, dt) = match scheduler.next(net, &marking, clock, &mut rng)? {
                Decision::Terminal => break StopReason::TerminalState,
                Decision::Fire { transition, dt } => (transition, dt),
            };
            let time = clock + dt;
            if !time.is_finite() {
                break StopReason::TerminalState;
            }
            match config.horizon {
                Some(horizon) if time > horizon => {
                    clock = horizon;
                    break StopReason::Horizon;
                }
                _ => {}
            }

            let pre = marking.clone();
            marking.apply_in_place(transition, net)?;
            clock = time;
            events += 1;
            trace!("event {events}: {transition:?} at t={time}");
            recorder.on_event(transition, time, pre, &marking);
        };

        // a dead net stays put, so the record can extend to the horizon
        let end = match (stop, config.horizon) {
            (StopReason::TerminalState, Some(horizon)) if horizon.is_finite() => horizon,
            _ => clock,
        };
        let trajectory = recorder.finish(end, &marking);
        debug!("run stop: seed={seed} reason={stop:?} events={events} t={clock}");

        Ok(RunOutcome {
            trajectory,
            stop,
            events,
            final_time: clock,
            seed,
        })
    }

    /// Independent replicates, one per seed, run in parallel. Results keep
    /// the order of `seeds`.
    pub fn replicate(
        &self,
        initial: &Marking,
        config: &RunConfig,
        seeds: &[u64],
    ) -> Result<Vec<RunOutcome>, SimError> {
        debug!("running {} replicate(s)", seeds.len());
        seeds
            .par_iter()
            .map(|&seed| self.run_seeded(initial, config, seed))
            .collect()
    }
}

/// Deterministic per-replicate seeds derived from one base seed.
pub fn derive_seeds(base: u64, count: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(base);
    (0..count).map(|_| rng.random::<u64>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{ConservationLaw, PlaceId, Rate, Weight};
    use crate::sim::enabling::is_enabled;
    use crate::sim::scheduler::FiringPolicy;
    use crate::sim::trajectory::SnapshotPolicy;
    use proptest::prelude::*;

    fn isomerisation(a: Weight, b: Weight) -> Net {
        let mut net = Net::empty();
        let pa = net.add_place("A", a).unwrap();
        let pb = net.add_place("B", b).unwrap();
        let fwd = net.add_transition("fwd", Rate::mass_action(1.0)).unwrap();
        let back = net.add_transition("back", Rate::mass_action(0.5)).unwrap();
        net.add_input_arc(pa, fwd, 1).unwrap();
        net.add_output_arc(pb, fwd, 1).unwrap();
        net.add_input_arc(pb, back, 1).unwrap();
        net.add_output_arc(pa, back, 1).unwrap();
        net.add_conservation_law(ConservationLaw::uniform("total", [pa, pb]))
            .unwrap();
        net.freeze().unwrap();
        net
    }

    fn bounded(horizon: f64, seed: u64) -> RunConfig {
        RunConfig {
            horizon: Some(horizon),
            seed,
            ..RunConfig::default()
        }
    }

    #[test]
    fn unfrozen_net_is_rejected() {
        let net = Net::empty();
        assert!(matches!(Simulation::new(&net), Err(SimError::NotFrozen)));
    }

    #[test]
    fn wrong_marking_length_is_rejected() {
        let net = isomerisation(3, 0);
        let sim = Simulation::new(&net).unwrap();
        let err = sim
            .run(&Marking::from(vec![1]), &RunConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::MarkingMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn horizon_clamps_the_clock() {
        let net = isomerisation(10, 0);
        let sim = Simulation::new(&net).unwrap();
        let outcome = sim.run(&net.initial_marking(), &bounded(2.0, 1)).unwrap();
        assert_eq!(outcome.stop, StopReason::Horizon);
        assert_eq!(outcome.final_time, 2.0);
        assert!(outcome.trajectory.events().iter().all(|e| e.time <= 2.0));
        let (last_time, _) = outcome.trajectory.samples().last().unwrap();
        assert_eq!(last_time, 2.0);
    }

    #[test]
    fn max_events_stops_the_run() {
        let net = isomerisation(10, 0);
        let sim = Simulation::new(&net).unwrap();
        let config = RunConfig {
            max_events: 5,
            ..RunConfig::default()
        };
        let outcome = sim.run(&net.initial_marking(), &config).unwrap();
        assert_eq!(outcome.stop, StopReason::MaxEvents);
        assert_eq!(outcome.events, 5);
        assert_eq!(outcome.trajectory.events().len(), 5);
    }

    #[test]
    fn vanishing_rate_ends_as_terminal_state() {
        let mut net = Net::empty();
        let p = net.add_place("p", 0).unwrap();
        let t = net.add_transition("t", Rate::constant(1e-320)).unwrap();
        net.add_output_arc(p, t, 1).unwrap();
        net.freeze().unwrap();
        let sim = Simulation::new(&net).unwrap();
        let config = RunConfig {
            max_events: 1,
            snapshot: SnapshotPolicy::Interval { interval: 1.0 },
            ..RunConfig::default()
        };
        let outcome = sim.run(&net.initial_marking(), &config).unwrap();
        assert_eq!(outcome.stop, StopReason::TerminalState);
        assert_eq!(outcome.events, 0);
        assert_eq!(outcome.final_time, 0.0);
        assert_eq!(outcome.trajectory.sample_count(), 1);
    }

    #[test]
    fn timed_overflow_ends_as_terminal_state() {
        let mut net = Net::empty();
        let p = net.add_place("p", 0).unwrap();
        let t = net.add_transition("t", Rate::delay(f64::MAX)).unwrap();
        net.add_output_arc(p, t, 1).unwrap();
        net.freeze().unwrap();
        let config = RunConfig {
            policy: FiringPolicy::Timed,
            snapshot: SnapshotPolicy::Interval { interval: f64::MAX },
            max_events: 4,
            ..RunConfig::default()
        };
        let outcome = Simulation::new(&net)
            .unwrap()
            .run(&net.initial_marking(), &config)
            .unwrap();
        assert_eq!(outcome.stop, StopReason::TerminalState);
        assert_eq!(outcome.events, 1);
        assert_eq!(outcome.final_time, f64::MAX);
    }

    #[test]
    fn cancelled_token_stops_before_first_event() {
        let net = isomerisation(10, 0);
        let token = CancelToken::new();
        token.cancel();
        let sim = Simulation::new(&net).unwrap().with_cancel(token);
        let outcome = sim.run(&net.initial_marking(), &bounded(5.0, 1)).unwrap();
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.events, 0);
        assert_eq!(outcome.final_marking(), &net.initial_marking());
    }

    #[test]
    fn timed_run_is_deterministic_in_time() {
        let mut net = Net::empty();
        let queue = net.add_place("queue", 3).unwrap();
        let done = net.add_place("done", 0).unwrap();
        let serve = net.add_transition("serve", Rate::delay(1.5)).unwrap();
        net.add_input_arc(queue, serve, 1).unwrap();
        net.add_output_arc(done, serve, 1).unwrap();
        net.freeze().unwrap();

        let sim = Simulation::new(&net).unwrap();
        let config = RunConfig {
            policy: FiringPolicy::Timed,
            ..RunConfig::default()
        };
        let outcome = sim.run(&net.initial_marking(), &config).unwrap();
        assert_eq!(outcome.stop, StopReason::TerminalState);
        let times: Vec<f64> = outcome.trajectory.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1.5, 3.0, 4.5]);
        assert_eq!(outcome.final_marking().get(done), 3);
    }

    #[test]
    fn replicates_keep_seed_order_and_match_single_runs() {
        let net = isomerisation(20, 0);
        let sim = Simulation::new(&net).unwrap();
        let config = bounded(3.0, 0);
        let seeds = derive_seeds(9, 4);
        let outcomes = sim.replicate(&net.initial_marking(), &config, &seeds).unwrap();
        assert_eq!(outcomes.len(), 4);
        for (outcome, &seed) in outcomes.iter().zip(&seeds) {
            assert_eq!(outcome.seed, seed);
            let single = sim.run_seeded(&net.initial_marking(), &config, seed).unwrap();
            assert_eq!(single.trajectory, outcome.trajectory);
        }
    }

    #[test]
    fn derived_seeds_are_stable() {
        assert_eq!(derive_seeds(1, 5), derive_seeds(1, 5));
        assert_ne!(derive_seeds(1, 5), derive_seeds(2, 5));
        assert_eq!(derive_seeds(1, 3)[..], derive_seeds(1, 5)[..3]);
    }

    /// Random small nets: `(initial tokens, [(inputs, outputs)])`.
    fn arb_net() -> impl Strategy<Value = Net> {
        let arcs = || prop::collection::vec((0usize..4, 1u64..3), 0..3);
        (
            prop::collection::vec(0u64..6, 1..5),
            prop::collection::vec((arcs(), arcs(), 0.1f64..3.0), 1..5),
        )
            .prop_map(|(tokens, transitions)| {
                let mut net = Net::empty();
                let places: Vec<PlaceId> = tokens
                    .iter()
                    .enumerate()
                    .map(|(i, &n)| net.add_place(format!("p{i}"), n).unwrap())
                    .collect();
                for (i, (inputs, outputs, k)) in transitions.into_iter().enumerate() {
                    let t = net
                        .add_transition(format!("t{i}"), Rate::mass_action(k))
                        .unwrap();
                    for (p, w) in inputs {
                        net.add_input_arc(places[p % places.len()], t, w).unwrap();
                    }
                    for (p, w) in outputs {
                        net.add_output_arc(places[p % places.len()], t, w).unwrap();
                    }
                }
                net.freeze().unwrap();
                net
            })
    }

    proptest! {
        #[test]
        fn events_fire_only_when_enabled(net in arb_net(), seed in any::<u64>()) {
            let sim = Simulation::new(&net).unwrap();
            let config = RunConfig { horizon: Some(5.0), seed, max_events: 200, ..RunConfig::default() };
            let outcome = sim.run(&net.initial_marking(), &config).unwrap();
            let events = outcome.trajectory.events();
            let mut previous = 0.0;
            for (i, event) in events.iter().enumerate() {
                prop_assert!(is_enabled(&net, &event.pre_marking, event.transition));
                prop_assert!(event.time > previous);
                previous = event.time;
                let post = event.pre_marking.apply(event.transition, &net).unwrap();
                let expected = events
                    .get(i + 1)
                    .map_or(outcome.final_marking(), |next| &next.pre_marking);
                prop_assert_eq!(&post, expected);
            }
        }

        #[test]
        fn identical_inputs_give_identical_runs(net in arb_net(), seed in any::<u64>()) {
            let sim = Simulation::new(&net).unwrap();
            let config = RunConfig { horizon: Some(5.0), seed, max_events: 200, ..RunConfig::default() };
            let first = sim.run(&net.initial_marking(), &config).unwrap();
            let second = sim.run(&net.initial_marking(), &config).unwrap();
            prop_assert_eq!(first.trajectory, second.trajectory);
            prop_assert_eq!(first.stop, second.stop);
        }

        #[test]
        fn conservation_holds_on_every_event(a in 0u64..30, b in 0u64..30, seed in any::<u64>()) {
            let net = isomerisation(a, b);
            let sim = Simulation::new(&net).unwrap();
            let config = RunConfig {
                horizon: Some(4.0),
                seed,
                snapshot: SnapshotPolicy::Interval { interval: 0.25 },
                ..RunConfig::default()
            };
            let reference = net.initial_marking();
            let outcome = sim.run(&reference, &config).unwrap();
            for event in outcome.trajectory.events() {
                prop_assert!(net.check_conservation(&event.pre_marking, &reference).is_none());
            }
            prop_assert!(net.check_conservation(outcome.final_marking(), &reference).is_none());
            for (_, marking) in outcome.trajectory.samples() {
                prop_assert_eq!(marking.total(), (a + b) as u128);
            }
        }
    }

    #[test]
    fn sampled_clock_never_decreases() {
        let net = isomerisation(15, 5);
        let sim = Simulation::new(&net).unwrap();
        let outcome = sim.run(&net.initial_marking(), &bounded(10.0, 3)).unwrap();
        let times: Vec<f64> = outcome.trajectory.samples().map(|(t, _)| t).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
