//! Profiling artifacts: resource kinds, measurements and collection.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod collector;
pub mod pprof;
pub mod share;

pub use collector::ProfileCollector;
pub use share::{
    DEFAULT_SHARE_URL, FlamegraphClient, OfflineSharer, ProfileSharer, SharedProfile, SubProfile,
};

/// One of the three tracked measurement dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    AllocSpace,
    AllocObjects,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Cpu, Self::AllocSpace, Self::AllocObjects];

    /// Canonical resource name as shown in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::AllocSpace => "alloc_space",
            Self::AllocObjects => "alloc_objects",
        }
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Cpu => "ns",
            Self::AllocSpace => "bytes",
            Self::AllocObjects => "count",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Known names for each resource kind, as found in profile sample types and
/// in the sharing service's sub-profile lists. Add new spellings here.
const ALIASES: &[(&str, ResourceKind)] = &[
    ("cpu", ResourceKind::Cpu),
    ("cpu_nanoseconds", ResourceKind::Cpu),
    ("process_cpu:cpu:nanoseconds", ResourceKind::Cpu),
    ("alloc_space", ResourceKind::AllocSpace),
    ("alloc_space_bytes", ResourceKind::AllocSpace),
    ("memory:alloc_space:bytes", ResourceKind::AllocSpace),
    ("alloc_objects", ResourceKind::AllocObjects),
    ("alloc_objects_count", ResourceKind::AllocObjects),
    ("memory:alloc_objects:count", ResourceKind::AllocObjects),
];

/// Map an externally reported name to a tracked resource kind.
#[must_use]
pub fn resource_for_alias(name: &str) -> Option<ResourceKind> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, kind)| *kind)
}

/// Scalar total for one resource kind plus its shareable key.
///
/// An empty key means the profile could not be shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMeasurement {
    pub kind: ResourceKind,
    pub total: i64,
    #[serde(default)]
    pub key: String,
}

/// Everything collected from one benchmark execution on one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkMeasurement {
    pub measurements: Vec<ProfileMeasurement>,
    /// Captured stdout of the benchmark process.
    pub raw_output: String,
}

impl BenchmarkMeasurement {
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&ProfileMeasurement> {
        self.measurements.iter().find(|m| m.kind == kind)
    }
}
