use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A single point-in-time status read.
///
/// Counters are keyed by name. A `None` value means the backend did not
/// report the counter (unknown), which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    counters: BTreeMap<String, Option<u64>>,
    taken_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Builder-style counter insertion
    pub fn with_counter(mut self, name: impl Into<String>, value: Option<u64>) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    pub fn from_counters<I, K>(counters: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<u64>)>,
        K: Into<String>,
    {
        Self {
            counters: counters.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            taken_at: Utc::now(),
        }
    }

    /// Value of a counter. Returns `None` both for a missing counter and for
    /// one reported as unknown; use [`StatusSnapshot::contains`] to tell them apart.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.counters.contains_key(name)
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, Option<u64>)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// True when every counter is known and zero. An empty snapshot is
    /// vacuously all-zero.
    pub fn all_zero(&self) -> bool {
        self.counters.values().all(|v| *v == Some(0))
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.counters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{}: {}", name, v)?,
                None => write!(f, "{}: null", name)?,
            }
        }
        write!(f, "}}")
    }
}

type Predicate = dyn Fn(&StatusSnapshot) -> bool + Send + Sync;

/// What "done" means for a poll session.
#[derive(Clone)]
pub struct ConvergenceRequest {
    description: String,
    predicate: Arc<Predicate>,
}

impl ConvergenceRequest {
    /// Arbitrary predicate over a snapshot
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&StatusSnapshot) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Every counter in the snapshot is zero
    pub fn all_zero() -> Self {
        Self::new("all counters zero", StatusSnapshot::all_zero)
    }

    /// The named counters are present, known and zero. Other counters in the
    /// snapshot are ignored.
    pub fn counters_zero<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let description = format!("{} zero", names.join(", "));

        Self::new(description, move |snapshot| {
            names.iter().all(|name| snapshot.get(name) == Some(0))
        })
    }

    pub fn is_converged(&self, snapshot: &StatusSnapshot) -> bool {
        (self.predicate)(snapshot)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for ConvergenceRequest {
    fn default() -> Self {
        Self::all_zero()
    }
}

impl fmt::Debug for ConvergenceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergenceRequest")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
