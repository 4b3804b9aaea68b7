use serde::Deserialize;
use std::time::{Duration, Instant};

/// Budget bounding how much of the transition graph one run explores.
///
/// The time parts are summed into a single duration; a zero duration means no
/// time limit. A non-zero `percent` takes precedence over `cases`. Zero
/// everywhere means "explore until every transition has been attempted".
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StopCondition {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub percent: u64,
    #[serde(default)]
    pub cases: u64,
}

/// A [`StopCondition`] resolved against a concrete run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplorationLimits {
    /// Number of attempted transitions after which the run stops.
    pub case_cutoff: Option<u64>,
    /// Instant after which no further transition is started.
    pub deadline: Option<Instant>,
}

impl StopCondition {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn after_cases(cases: u64) -> Self {
        Self {
            cases,
            ..Self::default()
        }
    }

    pub fn after_percent(percent: u64) -> Self {
        Self {
            percent,
            ..Self::default()
        }
    }

    /// Total wall-clock budget, `None` when no time part is set.
    pub fn duration(&self) -> Option<Duration> {
        let secs = self
            .days
            .saturating_mul(24)
            .saturating_add(self.hours)
            .saturating_mul(60)
            .saturating_add(self.minutes)
            .saturating_mul(60)
            .saturating_add(self.seconds);
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Effective number of transitions after which to stop, out of `total`.
    ///
    /// `percent` is rounded up so that any non-zero percentage attempts at
    /// least one transition.
    pub fn case_cutoff(&self, total: u64) -> Option<u64> {
        if self.percent > 0 {
            let scaled = u128::from(self.percent) * u128::from(total);
            let cutoff = scaled.div_ceil(100);
            Some(u64::try_from(cutoff).unwrap_or(u64::MAX))
        } else if self.cases > 0 {
            Some(self.cases)
        } else {
            None
        }
    }

    pub fn resolve(&self, total: u64, now: Instant) -> ExplorationLimits {
        ExplorationLimits {
            case_cutoff: self.case_cutoff(total),
            deadline: self.duration().and_then(|d| now.checked_add(d)),
        }
    }
}

impl ExplorationLimits {
    /// Whether a run that has attempted `attempts` transitions must stop at `now`.
    pub fn reached(&self, attempts: u64, now: Instant) -> bool {
        let out_of_time = self.deadline.is_some_and(|deadline| now > deadline);
        let out_of_cases = self.case_cutoff.is_some_and(|cutoff| attempts >= cutoff);
        out_of_time || out_of_cases
    }
}
