use std::collections::{BTreeMap, BTreeSet};

/// Untried edges of the complete transition graph over `n` states.
///
/// States are referred to by their index in the run's state list. An entry
/// exists for a source state only while it still has untried targets, so
/// `is_empty` doubles as "full coverage reached".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemainingTransitions {
    by_source: BTreeMap<usize, BTreeSet<usize>>,
}

impl RemainingTransitions {
    /// Every ordered pair `(from, to)` with `from != to` over `n` states.
    pub fn full(n: usize) -> Self {
        let by_source: BTreeMap<usize, BTreeSet<usize>> = if n < 2 {
            BTreeMap::new()
        } else {
            (0..n)
                .map(|from| (from, (0..n).filter(|&to| to != from).collect::<BTreeSet<_>>()))
                .collect()
        };
        Self { by_source }
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Number of untried edges.
    pub fn len(&self) -> usize {
        self.by_source.values().map(BTreeSet::len).sum()
    }

    pub fn has_source(&self, from: usize) -> bool {
        self.by_source.contains_key(&from)
    }

    /// Source states that still have untried targets, in ascending order.
    pub fn sources(&self) -> Vec<usize> {
        self.by_source.keys().copied().collect()
    }

    /// Untried targets of `from`, in ascending order.
    pub fn targets(&self, from: usize) -> Vec<usize> {
        self.by_source
            .get(&from)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Marks `from -> to` as tried. Returns `false` if the edge was not untried.
    pub fn take(&mut self, from: usize, to: usize) -> bool {
        let Some(targets) = self.by_source.get_mut(&from) else {
            return false;
        };
        let removed = targets.remove(&to);
        if targets.is_empty() {
            self.by_source.remove(&from);
        }
        removed
    }
}
