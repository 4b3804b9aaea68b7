//! Randomized full-coverage exploration of the transitions between recorded
//! device states.
//!
//! A run walks the complete directed graph over the recorded states, one edge
//! at a time, driving the live device with a [`ConfigTransactor`]. After a
//! failed transition the live state is unknown, so the walk re-synchronizes by
//! applying a randomly chosen state that still has untried outgoing edges.

use crate::config::ExplorerSettings;
use crate::graph::RemainingTransitions;
use crate::progress::{DeadlineExtender, ProgressReporter};
use crate::scheduler::{RandomScheduler, Scheduler};
use crate::stop::{ExplorationLimits, StopCondition};
use crate::transactor::{ConfigTransactor, TransitionOutcome};
use rand_core::RngCore;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end an exploration run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExploreError {
    /// Fewer than two distinct states are recorded, so there is no transition to make.
    #[error(
        "No transitions to make: {found} state(s) recorded for device {device}. \
         Record more states first."
    )]
    InsufficientStates { device: String, found: usize },

    /// The device could not be brought back to any known state.
    #[error("Failed to regain a known state despite multiple attempts")]
    ReSyncExhausted { attempts: u32 },

    /// The scheduler answered with something other than an untried transition.
    #[error("Exploration stopped: the scheduler picked {picked}, which is not an untried transition")]
    InvalidPick { picked: String },
}

/// One attempted edge of the transition graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: String,
    pub to: String,
}

/// An attempted edge that did not end in [`TransitionOutcome::Success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransition {
    pub from: String,
    pub to: String,
    pub outcome: TransitionOutcome,
}

impl fmt::Display for FailedTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ==> {}", self.from, self.to, self.outcome)
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorationReport {
    /// `N * (N - 1)` for the `N` distinct states of the run.
    pub total_transitions: u64,
    /// Every attempted edge, in the order it was attempted.
    pub attempted: Vec<Transition>,
    /// Every failed edge, in the order it was attempted.
    pub failed: Vec<FailedTransition>,
    /// Successful re-synchronizations. These do not count as attempts.
    pub resyncs: u64,
    /// Edges never attempted.
    pub untried: u64,
    /// A stop condition ended the run before full coverage.
    pub stopped_early: bool,
    /// Set when the run was abandoned.
    pub aborted: Option<ExploreError>,
}

impl ExplorationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }

    /// One `"{from}: {to} ==> {outcome}"` line per failed edge.
    pub fn failure_lines(&self) -> String {
        self.failed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The collaborators a run drives. Borrowed for the duration of one run only.
pub struct ExplorationContext<'a> {
    pub transactor: &'a mut dyn ConfigTransactor,
    pub progress: &'a mut dyn ProgressReporter,
    pub deadline: &'a mut dyn DeadlineExtender,
    /// The single source of randomness for the run.
    pub rng: &'a mut dyn RngCore,
}

/// Drives a device through the transitions between its recorded states.
pub struct TransitionExplorer {
    settings: ExplorerSettings,
    scheduler: Box<dyn Scheduler>,
}

impl TransitionExplorer {
    pub fn new(settings: ExplorerSettings) -> Self {
        Self::with_scheduler(settings, Box::new(RandomScheduler::new()))
    }

    pub fn with_scheduler(settings: ExplorerSettings, scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            settings,
            scheduler,
        }
    }

    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    /// Explores the transitions between `states` of `device` until every
    /// ordered pair has been attempted, a stop condition is met, or the device
    /// cannot be re-synchronized.
    ///
    /// Failed transitions are recorded in the report, never returned as
    /// errors. The only error is [`ExploreError::InsufficientStates`], raised
    /// before anything is sent to the device. A run abandoned midway keeps its
    /// partial results and carries the reason in [`ExplorationReport::aborted`].
    pub fn explore(
        &mut self,
        device: &str,
        states: &[String],
        stop: &StopCondition,
        ctx: &mut ExplorationContext<'_>,
    ) -> Result<ExplorationReport, ExploreError> {
        let mut distinct: Vec<&str> = Vec::with_capacity(states.len());
        for state in states {
            if !distinct.contains(&state.as_str()) {
                distinct.push(state);
            }
        }
        let num_states = distinct.len();
        if num_states < 2 {
            return Err(ExploreError::InsufficientStates {
                device: device.to_string(),
                found: num_states,
            });
        }

        let total = (num_states * (num_states - 1)) as u64;
        ctx.progress.progress(&format!(
            "Found {num_states} states recorded for device {device} which gives a total of {total} transitions."
        ));
        let limits = stop.resolve(total, Instant::now());
        debug!(
            device,
            case_cutoff = ?limits.case_cutoff,
            deadline = ?limits.deadline,
            "resolved stop conditions"
        );

        let report = self.walk(device, &distinct, total, limits, ctx);
        info!(
            device,
            attempted = report.attempted.len(),
            failed = report.failed.len(),
            untried = report.untried,
            aborted = report.aborted.is_some(),
            "exploration finished"
        );
        Ok(report)
    }

    fn walk(
        &mut self,
        device: &str,
        states: &[&str],
        total: u64,
        limits: ExplorationLimits,
        ctx: &mut ExplorationContext<'_>,
    ) -> ExplorationReport {
        let mut remaining = RemainingTransitions::full(states.len());
        let mut report = ExplorationReport {
            total_transitions: total,
            ..ExplorationReport::default()
        };
        let mut current: Option<usize> = None;
        let mut index: u64 = 0;

        loop {
            if remaining.is_empty() {
                break;
            }
            if limits.reached(index, Instant::now()) {
                ctx.progress.progress("Requested stop-after limit reached");
                report.stopped_early = true;
                break;
            }

            let from = match current.filter(|&state| remaining.has_source(state)) {
                Some(state) => state,
                None => match self.resync(device, states, &remaining, ctx) {
                    Ok(state) => {
                        report.resyncs += 1;
                        state
                    }
                    Err(e) => {
                        report.aborted = Some(e);
                        break;
                    }
                },
            };

            let picked = self.scheduler.pick_target(&remaining, from, ctx.rng);
            let Some(to) = picked.filter(|&to| remaining.take(from, to)) else {
                warn!(
                    device,
                    from = states[from],
                    ?picked,
                    "scheduler returned no untried target"
                );
                let picked = match picked {
                    Some(to) => format!("target {to} from state {}", states[from]),
                    None => format!("no target from state {}", states[from]),
                };
                report.aborted = Some(ExploreError::InvalidPick { picked });
                break;
            };

            index += 1;
            let (from_name, to_name) = (states[from], states[to]);
            ctx.progress.progress(&format!(
                "Transition {index}/{total}: {from_name} ==> {to_name}"
            ));
            ctx.deadline.extend(self.settings.transition_timeout_secs);
            let outcome = ctx.transactor.transition_to(device, to_name);
            report.attempted.push(Transition {
                from: from_name.to_string(),
                to: to_name.to_string(),
            });

            if outcome.is_success() {
                current = Some(to);
            } else {
                debug!(device, from = from_name, to = to_name, %outcome, "transition failed");
                report.failed.push(FailedTransition {
                    from: from_name.to_string(),
                    to: to_name.to_string(),
                    outcome,
                });
                ctx.progress.progress(&format!("   {outcome}"));
                current = None;
            }
        }

        report.untried = remaining.len() as u64;
        report
    }

    /// Brings the device into a state that still has untried outgoing edges.
    ///
    /// Makes at least one attempt even when `resync_attempts` is 0.
    fn resync(
        &mut self,
        device: &str,
        states: &[&str],
        remaining: &RemainingTransitions,
        ctx: &mut ExplorationContext<'_>,
    ) -> Result<usize, ExploreError> {
        let attempts = self.settings.resync_attempts.max(1);
        for attempt in 1..=attempts {
            let picked = self.scheduler.pick_source(remaining, ctx.rng);
            // Sources are always valid state indices, so this also bounds `candidate`.
            let Some(candidate) = picked.filter(|&state| remaining.has_source(state)) else {
                warn!(device, ?picked, "scheduler returned no untried source");
                let picked = match picked {
                    Some(state) => format!("source {state}"),
                    None => "no source".to_string(),
                };
                return Err(ExploreError::InvalidPick { picked });
            };
            ctx.progress
                .progress(&format!("Starting from known state {}", states[candidate]));
            ctx.deadline.extend(self.settings.transition_timeout_secs);
            let outcome = ctx.transactor.transition_to(device, states[candidate]);
            if outcome.is_success() {
                return Ok(candidate);
            }
            ctx.progress.progress("... failed setting known state");
            debug!(device, attempt, state = states[candidate], %outcome, "re-sync failed");
        }
        warn!(device, attempts, "giving up on re-sync");
        Err(ExploreError::ReSyncExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{RecordingDeadline, RecordingProgress};
    use proptest::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;
    use std::collections::HashSet;
    use std::time::Duration;

    /// A device whose answer to each transition is decided by `rule`, given
    /// the live state (if known), the requested state and the call number.
    struct FakeDevice<F> {
        live: Option<String>,
        calls: Vec<String>,
        rule: F,
    }

    impl<F> FakeDevice<F>
    where
        F: FnMut(Option<&str>, &str, usize) -> TransitionOutcome,
    {
        fn new(rule: F) -> Self {
            Self {
                live: None,
                calls: Vec::new(),
                rule,
            }
        }
    }

    impl<F> ConfigTransactor for FakeDevice<F>
    where
        F: FnMut(Option<&str>, &str, usize) -> TransitionOutcome,
    {
        fn transition_to(&mut self, _device: &str, state: &str) -> TransitionOutcome {
            let outcome = (self.rule)(self.live.as_deref(), state, self.calls.len());
            self.calls.push(state.to_string());
            self.live = outcome.is_success().then(|| state.to_string());
            outcome
        }
    }

    fn always(
        outcome: TransitionOutcome,
    ) -> impl FnMut(Option<&str>, &str, usize) -> TransitionOutcome {
        move |_, _, _| outcome
    }

    fn names(states: &[&str]) -> Vec<String> {
        states.iter().map(|s| s.to_string()).collect()
    }

    struct Run<F> {
        result: Result<ExplorationReport, ExploreError>,
        device: FakeDevice<F>,
        progress: RecordingProgress,
        deadline: RecordingDeadline,
    }

    fn run_with<F>(
        settings: ExplorerSettings,
        states: &[&str],
        stop: StopCondition,
        seed: u8,
        device: FakeDevice<F>,
    ) -> Run<F>
    where
        F: FnMut(Option<&str>, &str, usize) -> TransitionOutcome,
    {
        let mut device = device;
        let mut progress = RecordingProgress::new();
        let mut deadline = RecordingDeadline::new();
        let mut rng = ChaCha8Rng::from_seed([seed; 32]);
        let mut explorer = TransitionExplorer::new(settings);
        let result = {
            let mut ctx = ExplorationContext {
                transactor: &mut device,
                progress: &mut progress,
                deadline: &mut deadline,
                rng: &mut rng,
            };
            explorer.explore("r1", &names(states), &stop, &mut ctx)
        };
        Run {
            result,
            device,
            progress,
            deadline,
        }
    }

    fn run<F>(states: &[&str], stop: StopCondition, seed: u8, rule: F) -> Run<F>
    where
        F: FnMut(Option<&str>, &str, usize) -> TransitionOutcome,
    {
        run_with(
            ExplorerSettings::default(),
            states,
            stop,
            seed,
            FakeDevice::new(rule),
        )
    }

    #[test]
    fn three_states_all_succeeding_cover_every_pair_once() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::unlimited(),
            0,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        assert!(report.is_success());
        assert!(!report.stopped_early);
        assert_eq!(report.total_transitions, 6);
        assert_eq!(report.attempted.len(), 6);
        assert_eq!(report.untried, 0);

        let pairs: HashSet<(String, String)> = report
            .attempted
            .iter()
            .map(|t| (t.from.clone(), t.to.clone()))
            .collect();
        assert_eq!(pairs.len(), 6);
        for from in ["a", "b", "c"] {
            for to in ["a", "b", "c"] {
                if from != to {
                    assert!(pairs.contains(&(from.to_string(), to.to_string())));
                }
            }
        }
    }

    #[test]
    fn resync_transitions_are_not_counted() {
        let run = run(
            &["a", "b", "c", "d"],
            StopCondition::unlimited(),
            3,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        assert_eq!(report.attempted.len(), 12);
        assert!(report.resyncs >= 1);
        assert_eq!(
            run.device.calls.len() as u64,
            report.attempted.len() as u64 + report.resyncs
        );

        let indices: Vec<&String> = run
            .progress
            .messages
            .iter()
            .filter(|m| m.starts_with("Transition "))
            .collect();
        assert_eq!(indices.len(), 12);
        assert!(indices[0].starts_with("Transition 1/12: "));
        assert!(indices[11].starts_with("Transition 12/12: "));
    }

    #[test]
    fn each_edge_starts_where_the_device_is() {
        let run = run(
            &["a", "b", "c", "d"],
            StopCondition::unlimited(),
            5,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        // Re-sync calls land exactly on the source of the following edge.
        let mut live: Option<&str> = None;
        let mut calls = run.device.calls.iter();
        for edge in &report.attempted {
            if live != Some(edge.from.as_str()) {
                assert_eq!(calls.next().map(String::as_str), Some(edge.from.as_str()));
            }
            assert_eq!(calls.next().map(String::as_str), Some(edge.to.as_str()));
            live = Some(edge.to.as_str());
        }
        assert!(calls.next().is_none());
    }

    #[test]
    fn progress_messages_follow_the_walk() {
        let run = run(
            &["a", "b"],
            StopCondition::unlimited(),
            1,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        let messages = &run.progress.messages;
        assert_eq!(
            messages[0],
            "Found 2 states recorded for device r1 which gives a total of 2 transitions."
        );
        let first = &report.attempted[0];
        assert_eq!(messages[1], format!("Starting from known state {}", first.from));
        assert_eq!(
            messages[2],
            format!("Transition 1/2: {} ==> {}", first.from, first.to)
        );
        assert_eq!(
            messages[3],
            format!("Transition 2/2: {} ==> {}", first.to, first.from)
        );
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn deadline_is_extended_before_every_transaction() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::unlimited(),
            2,
            always(TransitionOutcome::Success),
        );
        assert_eq!(run.deadline.extensions.len(), run.device.calls.len());
        assert!(run.deadline.extensions.iter().all(|&secs| secs == 120));
    }

    #[test]
    fn a_single_state_is_rejected_without_touching_the_device() {
        let run = run(
            &["only"],
            StopCondition::unlimited(),
            0,
            always(TransitionOutcome::Success),
        );
        assert_eq!(
            run.result,
            Err(ExploreError::InsufficientStates {
                device: "r1".to_string(),
                found: 1
            })
        );
        assert!(run.device.calls.is_empty());
        assert!(run.progress.messages.is_empty());
        assert!(run.deadline.extensions.is_empty());
    }

    #[test]
    fn duplicate_names_count_once() {
        let run = run(
            &["a", "a"],
            StopCondition::unlimited(),
            0,
            always(TransitionOutcome::Success),
        );
        assert!(matches!(
            run.result,
            Err(ExploreError::InsufficientStates { found: 1, .. })
        ));
    }

    #[test]
    fn case_limit_stops_successfully() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::after_cases(2),
            0,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        assert_eq!(report.attempted.len(), 2);
        assert!(report.is_success());
        assert!(report.stopped_early);
        assert_eq!(report.untried, 4);
        assert_eq!(
            run.progress.messages.last().map(String::as_str),
            Some("Requested stop-after limit reached")
        );
    }

    #[test]
    fn percent_limit_rounds_up() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::after_percent(40),
            0,
            always(TransitionOutcome::Success),
        );
        // ceil(0.4 * 6) = 3
        assert_eq!(run.result.unwrap().attempted.len(), 3);
    }

    #[test]
    fn cutoff_beyond_the_graph_covers_everything() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::after_cases(100),
            0,
            always(TransitionOutcome::Success),
        );
        let report = run.result.unwrap();
        assert_eq!(report.attempted.len(), 6);
        assert!(!report.stopped_early);
    }

    #[test]
    fn time_limit_stops_between_transitions() {
        let run = run(
            &["a", "b", "c"],
            StopCondition {
                seconds: 1,
                ..StopCondition::default()
            },
            0,
            |_: Option<&str>, _: &str, _| {
                std::thread::sleep(Duration::from_millis(600));
                TransitionOutcome::Success
            },
        );
        let report = run.result.unwrap();
        // re-sync (0.6s) + first transition (1.2s) puts the clock past the deadline.
        assert_eq!(report.attempted.len(), 1);
        assert!(report.stopped_early);
        assert!(report.is_success());
    }

    #[test]
    fn a_failed_transition_forces_a_resync_and_the_walk_continues() {
        let run = run(
            &["a", "b", "c"],
            StopCondition::unlimited(),
            4,
            |live: Option<&str>, to: &str, _| {
                if live == Some("a") && to == "b" {
                    TransitionOutcome::OutOfSync
                } else {
                    TransitionOutcome::Success
                }
            },
        );
        let report = run.result.unwrap();
        assert_eq!(report.attempted.len(), 6);
        assert!(report.aborted.is_none());
        assert!(!report.is_success());
        assert_eq!(
            report.failed,
            vec![FailedTransition {
                from: "a".to_string(),
                to: "b".to_string(),
                outcome: TransitionOutcome::OutOfSync,
            }]
        );
        assert_eq!(report.failure_lines(), "a: b ==> out-of-sync");
        assert!(run.progress.messages.contains(&"   out-of-sync".to_string()));

        // Knowledge of the live state is lost, so the next edge starts with a re-sync.
        let messages = &run.progress.messages;
        let failed_at = messages.iter().position(|m| m == "   out-of-sync").unwrap();
        if let Some(next) = messages.get(failed_at + 1) {
            assert!(
                next.starts_with("Starting from known state "),
                "unexpected message after failure: {next}"
            );
        }
    }

    #[test]
    fn device_that_never_syncs_aborts_without_attempts() {
        let run = run(
            &["a", "b"],
            StopCondition::unlimited(),
            0,
            always(TransitionOutcome::TransactionFailed),
        );
        let report = run.result.unwrap();
        assert_eq!(
            report.aborted,
            Some(ExploreError::ReSyncExhausted { attempts: 10 })
        );
        assert!(report.attempted.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(run.device.calls.len(), 10);
        let failures = run
            .progress
            .messages
            .iter()
            .filter(|m| m.as_str() == "... failed setting known state")
            .count();
        assert_eq!(failures, 10);
    }

    #[test]
    fn resync_exhaustion_after_a_failure_keeps_partial_results() {
        // Only the very first call (the initial re-sync) succeeds.
        let run = run(
            &["a", "b"],
            StopCondition::unlimited(),
            0,
            |_: Option<&str>, _: &str, call| {
                if call == 0 {
                    TransitionOutcome::Success
                } else {
                    TransitionOutcome::TransactionFailed
                }
            },
        );
        let report = run.result.unwrap();
        assert_eq!(report.attempted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].outcome, TransitionOutcome::TransactionFailed);
        assert_eq!(
            report.aborted,
            Some(ExploreError::ReSyncExhausted { attempts: 10 })
        );
        // initial re-sync + one transition + ten failed re-syncs
        assert_eq!(run.device.calls.len(), 12);
        assert!(!report.is_success());
    }

    #[test]
    fn resync_attempts_are_configurable() {
        let settings = ExplorerSettings {
            resync_attempts: 3,
            transition_timeout_secs: 30,
            seed: None,
        };
        let run = run_with(
            settings,
            &["a", "b", "c"],
            StopCondition::unlimited(),
            0,
            FakeDevice::new(always(TransitionOutcome::TransactionFailed)),
        );
        let report = run.result.unwrap();
        assert_eq!(
            report.aborted,
            Some(ExploreError::ReSyncExhausted { attempts: 3 })
        );
        assert_eq!(run.device.calls.len(), 3);
        assert_eq!(run.deadline.extensions, vec![30, 30, 30]);
    }

    #[test]
    fn zero_resync_attempts_still_tries_once() {
        let settings = ExplorerSettings {
            resync_attempts: 0,
            ..ExplorerSettings::default()
        };
        let run = run_with(
            settings,
            &["a", "b"],
            StopCondition::unlimited(),
            0,
            FakeDevice::new(always(TransitionOutcome::TransactionFailed)),
        );
        let report = run.result.unwrap();
        assert_eq!(
            report.aborted,
            Some(ExploreError::ReSyncExhausted { attempts: 1 })
        );
        assert_eq!(run.device.calls.len(), 1);
    }

    /// Re-syncs to a fixed state whether or not it has untried edges left,
    /// and always takes the lowest untried target.
    struct FixedSource(usize);

    impl Scheduler for FixedSource {
        fn pick_source(
            &mut self,
            _remaining: &RemainingTransitions,
            _rng: &mut dyn RngCore,
        ) -> Option<usize> {
            Some(self.0)
        }

        fn pick_target(
            &mut self,
            remaining: &RemainingTransitions,
            from: usize,
            _rng: &mut dyn RngCore,
        ) -> Option<usize> {
            remaining.targets(from).first().copied()
        }
    }

    /// Never offers a target.
    struct NoTargets;

    impl Scheduler for NoTargets {
        fn pick_source(
            &mut self,
            remaining: &RemainingTransitions,
            _rng: &mut dyn RngCore,
        ) -> Option<usize> {
            remaining.sources().first().copied()
        }

        fn pick_target(
            &mut self,
            _remaining: &RemainingTransitions,
            _from: usize,
            _rng: &mut dyn RngCore,
        ) -> Option<usize> {
            None
        }
    }

    fn run_scheduled<F>(
        scheduler: Box<dyn Scheduler>,
        states: &[&str],
        device: &mut FakeDevice<F>,
    ) -> ExplorationReport
    where
        F: FnMut(Option<&str>, &str, usize) -> TransitionOutcome,
    {
        let mut progress = RecordingProgress::new();
        let mut deadline = RecordingDeadline::new();
        let mut rng = ChaCha8Rng::from_seed([0; 32]);
        let mut explorer = TransitionExplorer::with_scheduler(ExplorerSettings::default(), scheduler);
        let mut ctx = ExplorationContext {
            transactor: device,
            progress: &mut progress,
            deadline: &mut deadline,
            rng: &mut rng,
        };
        explorer
            .explore("r1", &names(states), &StopCondition::unlimited(), &mut ctx)
            .unwrap()
    }

    #[test]
    fn exhausted_resync_source_aborts_instead_of_finishing() {
        let mut device = FakeDevice::new(always(TransitionOutcome::Success));
        let report = run_scheduled(Box::new(FixedSource(0)), &["a", "b", "c"], &mut device);
        // a->b, b->a, a->c, c->a, then `a` has nothing left but is picked again.
        assert_eq!(report.attempted.len(), 4);
        assert_eq!(report.untried, 2);
        assert!(!report.stopped_early);
        assert!(report.failed.is_empty());
        assert_eq!(
            report.aborted,
            Some(ExploreError::InvalidPick {
                picked: "source 0".to_string()
            })
        );
        assert!(!report.is_success());
    }

    #[test]
    fn out_of_range_resync_source_aborts_without_touching_the_device() {
        let mut device = FakeDevice::new(always(TransitionOutcome::Success));
        let report = run_scheduled(Box::new(FixedSource(7)), &["a", "b", "c"], &mut device);
        assert!(device.calls.is_empty());
        assert!(report.attempted.is_empty());
        assert_eq!(report.untried, 6);
        assert!(matches!(report.aborted, Some(ExploreError::InvalidPick { .. })));
    }

    #[test]
    fn missing_target_aborts_the_run() {
        let mut device = FakeDevice::new(always(TransitionOutcome::Success));
        let report = run_scheduled(Box::new(NoTargets), &["a", "b"], &mut device);
        assert_eq!(device.calls, vec!["a"]);
        assert!(report.attempted.is_empty());
        assert_eq!(
            report.aborted,
            Some(ExploreError::InvalidPick {
                picked: "no target from state a".to_string()
            })
        );
        assert!(!report.is_success());
    }

    #[test]
    fn same_seed_same_walk() {
        let walk = |seed| {
            run(
                &["a", "b", "c", "d"],
                StopCondition::unlimited(),
                seed,
                always(TransitionOutcome::Success),
            )
            .result
            .unwrap()
            .attempted
        };
        assert_eq!(walk(9), walk(9));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn full_coverage_visits_every_pair_exactly_once(n in 2usize..8, seed in any::<u8>()) {
            let state_names: Vec<String> = (0..n).map(|i| format!("s{i}")).collect();
            let refs: Vec<&str> = state_names.iter().map(String::as_str).collect();
            let run = run(&refs, StopCondition::unlimited(), seed, always(TransitionOutcome::Success));
            let report = run.result.unwrap();
            prop_assert_eq!(report.attempted.len(), n * (n - 1));
            let distinct: HashSet<&Transition> = report.attempted.iter().collect();
            prop_assert_eq!(distinct.len(), n * (n - 1));
            prop_assert!(report.attempted.iter().all(|t| t.from != t.to));
        }
    }
}
