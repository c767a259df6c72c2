//! Change detection and execution planning.
//!
//! Benchmarks of both revisions are merged into one key space keyed by
//! (import path, benchmark name). Head records are inserted first, then
//! base, and iteration follows first-seen order, so a plan built from the
//! same inputs is always identical.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::PackageRecord;
use crate::workspace::RevisionSide;

/// Identity of a benchmark across both revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BenchmarkKey {
    pub import_path: String,
    pub benchmark: String,
}

impl BenchmarkKey {
    #[must_use]
    pub fn new(import_path: impl Into<String>, benchmark: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            benchmark: benchmark.into(),
        }
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.import_path, self.benchmark)
    }
}

/// Why a benchmark is in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// Present on both sides with differing binary hashes.
    CodeChanged,
    /// Only present on head.
    MissingInBase,
    /// Only present on base.
    MissingInHead,
}

impl ChangeReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeChanged => "code_changed",
            Self::MissingInBase => "missing_in_base",
            Self::MissingInHead => "missing_in_head",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only ordered records with a key to position index.
#[derive(Debug, Clone)]
pub struct KeyArena<T> {
    slots: Vec<(BenchmarkKey, T)>,
    index: HashMap<BenchmarkKey, usize>,
}

impl<T> Default for KeyArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> KeyArena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `key`, inserting `init()` at the end when it is new.
    pub fn insert_with(&mut self, key: BenchmarkKey, init: impl FnOnce() -> T) -> usize {
        if let Some(idx) = self.position(&key) {
            return idx;
        }
        let idx = self.slots.len();
        self.index.insert(key.clone(), idx);
        self.slots.push((key, init()));
        idx
    }

    #[must_use]
    pub fn position(&self, key: &BenchmarkKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn get_mut_at(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx).map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> IntoIterator for KeyArena<T> {
    type Item = (BenchmarkKey, T);
    type IntoIter = std::vec::IntoIter<(BenchmarkKey, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

/// One scheduled benchmark. Borrows the package records of the revisions.
#[derive(Debug, Clone)]
pub struct ComparisonEntry<'a> {
    pub key: BenchmarkKey,
    pub base: Option<&'a PackageRecord>,
    pub head: Option<&'a PackageRecord>,
    pub reason: ChangeReason,
}

impl<'a> ComparisonEntry<'a> {
    #[must_use]
    pub const fn side(&self, side: RevisionSide) -> Option<&'a PackageRecord> {
        match side {
            RevisionSide::Base => self.base,
            RevisionSide::Head => self.head,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Sides<'a> {
    base: Option<&'a PackageRecord>,
    head: Option<&'a PackageRecord>,
}

/// Classify one key. `None` means unchanged and excluded.
#[must_use]
pub fn classify(base: Option<&PackageRecord>, head: Option<&PackageRecord>) -> Option<ChangeReason> {
    match (base, head) {
        (Some(b), Some(h)) if b.same_content(h) => None,
        (Some(_), Some(_)) => Some(ChangeReason::CodeChanged),
        (None, Some(_)) => Some(ChangeReason::MissingInBase),
        (Some(_), None) => Some(ChangeReason::MissingInHead),
        (None, None) => None,
    }
}

fn insert_side<'a>(
    arena: &mut KeyArena<Sides<'a>>,
    packages: &'a [PackageRecord],
    side: RevisionSide,
) {
    for pkg in packages.iter().filter(|p| p.has_tests) {
        for name in &pkg.benchmarks {
            let idx = arena.insert_with(BenchmarkKey::new(&pkg.import_path, name), Sides::default);
            if let Some(slot) = arena.get_mut_at(idx) {
                match side {
                    RevisionSide::Base => slot.base = Some(pkg),
                    RevisionSide::Head => slot.head = Some(pkg),
                }
            }
        }
    }
}

/// Build the ordered execution plan from both revisions' package sets.
///
/// Must run after phase one completed for both sides.
#[must_use]
pub fn build_plan<'a>(
    base: &'a [PackageRecord],
    head: &'a [PackageRecord],
) -> Vec<ComparisonEntry<'a>> {
    let mut arena = KeyArena::new();
    insert_side(&mut arena, head, RevisionSide::Head);
    insert_side(&mut arena, base, RevisionSide::Base);

    arena
        .into_iter()
        .filter_map(|(key, sides)| {
            classify(sides.base, sides.head).map(|reason| ComparisonEntry {
                key,
                base: sides.base,
                head: sides.head,
                reason,
            })
        })
        .collect()
}
