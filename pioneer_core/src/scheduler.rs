use crate::graph::RemainingTransitions;
use rand::Rng;
use rand_core::RngCore;

/// A `Scheduler` decides which untried edge of the transition graph is
/// attempted next.
///
/// All randomness comes from the `rng` handed in by the caller, so a seeded
/// generator replays the same exploration order. The explorer checks every
/// answer against the graph: a pick that is not an untried edge ends the run
/// as aborted rather than as complete.
pub trait Scheduler: Send + Sync {
    /// Chooses the state to re-synchronize to when the live state is unknown.
    ///
    /// # Arguments
    /// * `remaining`: The untried edges of the current run. Never empty when
    ///   the explorer asks.
    /// * `rng`: The run's random number generator.
    ///
    /// # Returns
    /// The index of a state in `remaining.sources()`, or `None` if there is none.
    fn pick_source(
        &mut self,
        remaining: &RemainingTransitions,
        rng: &mut dyn RngCore,
    ) -> Option<usize>;

    /// Chooses the next untried target reachable from `from`.
    ///
    /// # Arguments
    /// * `remaining`: The untried edges of the current run.
    /// * `from`: Index of the state the device is known to be in. It always
    ///   has at least one untried target when the explorer asks.
    /// * `rng`: The run's random number generator.
    ///
    /// # Returns
    /// The index of a state in `remaining.targets(from)`, or `None` if `from`
    /// has no untried targets.
    fn pick_target(
        &mut self,
        remaining: &RemainingTransitions,
        from: usize,
        rng: &mut dyn RngCore,
    ) -> Option<usize>;
}

/// Picks uniformly among the candidates, in the ascending order the graph
/// hands them out.
#[derive(Default, Debug)]
pub struct RandomScheduler;

impl RandomScheduler {
    pub fn new() -> Self {
        RandomScheduler
    }

    fn choose(candidates: &[usize], rng: &mut dyn RngCore) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let index = rng.random_range(0..candidates.len());
        candidates.get(index).copied()
    }
}

impl Scheduler for RandomScheduler {
    fn pick_source(
        &mut self,
        remaining: &RemainingTransitions,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        Self::choose(&remaining.sources(), rng)
    }

    fn pick_target(
        &mut self,
        remaining: &RemainingTransitions,
        from: usize,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        Self::choose(&remaining.targets(from), rng)
    }
}
