use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde_json::Value;

use crate::parse::{record_id, subject_code};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    MissingId,
    Duplicate,
    OutsideNamespace,
}

/// Counters kept while records are offered to an [`Accumulator`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub accepted: usize,
    pub missing_id: usize,
    pub duplicates: usize,
    pub outside_namespace: usize,
    pub subject_codes: BTreeSet<String>,
}

impl FetchSummary {
    pub fn offered(&self) -> usize {
        self.accepted + self.missing_id + self.duplicates + self.outside_namespace
    }
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} accepted of {} fetched ", self.accepted, self.offered())?;
        write!(
            f,
            "({} without id, {} duplicate, {} outside namespace), {} subject codes",
            self.missing_id,
            self.duplicates,
            self.outside_namespace,
            self.subject_codes.len()
        )
    }
}

/// Ordered, deduplicated collection of accepted course records.
///
/// A record is kept only if it has a truthy `id` that was not seen before and a
/// `subjectCode` starting with the namespace. Order is first acceptance.
pub struct Accumulator {
    namespace: String,
    courses: Vec<Value>,
    seen: HashSet<String>,
    summary: FetchSummary,
}

impl Accumulator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            courses: Vec::new(),
            seen: HashSet::new(),
            summary: FetchSummary::default(),
        }
    }

    pub fn offer(&mut self, course: Value) -> Verdict {
        let verdict = self.judge(&course);

        match verdict {
            Verdict::Accepted => {
                self.summary.accepted += 1;
                if let Some(code) = subject_code(&course) {
                    self.summary.subject_codes.insert(code.to_owned());
                }
                if let Some(id) = record_id(&course) {
                    self.seen.insert(id);
                }
                self.courses.push(course);
            }
            Verdict::MissingId => self.summary.missing_id += 1,
            Verdict::Duplicate => self.summary.duplicates += 1,
            Verdict::OutsideNamespace => self.summary.outside_namespace += 1,
        }

        verdict
    }

    pub fn extend(&mut self, courses: impl IntoIterator<Item = Value>) {
        for course in courses {
            self.offer(course);
        }
    }

    fn judge(&self, course: &Value) -> Verdict {
        let Some(id) = record_id(course) else {
            return Verdict::MissingId;
        };
        if self.seen.contains(&id) {
            return Verdict::Duplicate;
        }
        match subject_code(course) {
            Some(code) if code.starts_with(&self.namespace) => Verdict::Accepted,
            _ => Verdict::OutsideNamespace,
        }
    }

    pub fn courses(&self) -> &[Value] {
        &self.courses
    }

    pub fn summary(&self) -> &FetchSummary {
        &self.summary
    }
}
