//! Turns the profiles of one benchmark execution into measurements.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::pprof::read_profile;
use super::{BenchmarkMeasurement, ProfileMeasurement, ProfileSharer, ResourceKind, SharedProfile, resource_for_alias};
use crate::error::Result;
use crate::toolchain::RunArtifacts;

/// Per-kind keys from an upload response.
///
/// Sub-profiles are matched through the alias table. A response without
/// sub-profiles applies its top-level key to every kind in the profile.
fn keys_for(shared: &SharedProfile, kinds: &[ResourceKind]) -> BTreeMap<ResourceKind, String> {
    let mut keys = BTreeMap::new();
    if shared.sub_profiles.is_empty() {
        if !shared.key.is_empty() {
            for kind in kinds {
                keys.insert(*kind, shared.key.clone());
            }
        }
        return keys;
    }
    for sub in &shared.sub_profiles {
        match resource_for_alias(&sub.name) {
            Some(kind) => {
                keys.insert(kind, sub.key.clone());
            }
            None => debug!(name = %sub.name, "ignoring untracked sub-profile"),
        }
    }
    keys
}

/// Parses profile artifacts and obtains shareable keys for them.
#[derive(Clone)]
pub struct ProfileCollector {
    sharer: Arc<dyn ProfileSharer>,
}

impl ProfileCollector {
    #[must_use]
    pub fn new(sharer: Arc<dyn ProfileSharer>) -> Self {
        Self { sharer }
    }

    fn collect_one(&self, path: &Path, out: &mut BTreeMap<ResourceKind, ProfileMeasurement>) -> Result<()> {
        let (bytes, profile) = read_profile(path)?;
        let totals = profile.resource_totals();
        let kinds: Vec<ResourceKind> = totals.iter().map(|(kind, _)| *kind).collect();

        let file_name = path
            .file_name()
            .map_or_else(|| "profile".into(), |n| n.to_string_lossy());
        let keys = match self.sharer.share(&file_name, &bytes) {
            Ok(shared) => keys_for(&shared, &kinds),
            Err(e) => {
                warn!(sharer = self.sharer.name(), file = %file_name, error = %e, "profile not shared");
                BTreeMap::new()
            }
        };

        for (kind, total) in totals {
            out.insert(
                kind,
                ProfileMeasurement {
                    kind,
                    total,
                    key: keys.get(&kind).cloned().unwrap_or_default(),
                },
            );
        }
        Ok(())
    }

    /// Build the measurement for one execution.
    ///
    /// Sharing failures leave keys empty; totals are always kept.
    ///
    /// # Errors
    ///
    /// Returns `ProfileParse` if a profile is missing or cannot be decoded.
    pub fn collect(&self, artifacts: &RunArtifacts) -> Result<BenchmarkMeasurement> {
        let mut by_kind = BTreeMap::new();
        for path in artifacts.profiles() {
            self.collect_one(path, &mut by_kind)?;
        }

        let measurements = ResourceKind::ALL
            .iter()
            .filter_map(|kind| by_kind.remove(kind))
            .collect();
        Ok(BenchmarkMeasurement {
            measurements,
            raw_output: artifacts.output.clone(),
        })
    }
}
