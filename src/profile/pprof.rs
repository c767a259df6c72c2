//! Minimal pprof decoding.
//!
//! Only the parts needed to total sample values are modelled; prost skips
//! every other field of the wire format.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use prost::Message;

use super::{ResourceKind, resource_for_alias};
use crate::error::{BenchError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Profile {
    #[prost(message, repeated, tag = "1")]
    pub sample_type: Vec<ValueType>,
    #[prost(message, repeated, tag = "2")]
    pub sample: Vec<Sample>,
    #[prost(string, repeated, tag = "6")]
    pub string_table: Vec<String>,
}

/// Sample type; both fields index into the string table.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValueType {
    #[prost(int64, tag = "1")]
    pub r#type: i64,
    #[prost(int64, tag = "2")]
    pub unit: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sample {
    #[prost(uint64, repeated, tag = "1")]
    pub location_id: Vec<u64>,
    /// One value per sample type.
    #[prost(int64, repeated, tag = "2")]
    pub value: Vec<i64>,
}

impl Profile {
    fn string(&self, idx: i64) -> &str {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.string_table.get(i))
            .map_or("", String::as_str)
    }

    /// Sum of every sample's value, per sample type name.
    #[must_use]
    pub fn totals_by_type(&self) -> BTreeMap<String, i64> {
        let mut totals = BTreeMap::new();
        for (idx, value_type) in self.sample_type.iter().enumerate() {
            let total = self
                .sample
                .iter()
                .filter_map(|s| s.value.get(idx))
                .fold(0i64, |acc, v| acc.saturating_add(*v));
            totals.insert(self.string(value_type.r#type).to_string(), total);
        }
        totals
    }

    /// Totals of the tracked resource kinds present in this profile.
    #[must_use]
    pub fn resource_totals(&self) -> Vec<(ResourceKind, i64)> {
        self.totals_by_type()
            .into_iter()
            .filter_map(|(name, total)| resource_for_alias(&name).map(|kind| (kind, total)))
            .collect()
    }
}

/// Decode a profile, gunzipping first when the payload is compressed.
///
/// # Errors
///
/// Returns an I/O error for broken gzip data or a decode error for an
/// invalid protobuf payload (as `Other`).
pub fn decode(bytes: &[u8]) -> Result<Profile> {
    let profile = if bytes.starts_with(&GZIP_MAGIC) {
        let mut raw = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut raw)?;
        Profile::decode(raw.as_slice())
    } else {
        Profile::decode(bytes)
    };
    profile.map_err(|e| BenchError::Other(e.into()))
}

/// Read and decode the profile at `path`.
///
/// # Errors
///
/// Returns `ProfileParse` if the file is missing or not a valid profile.
pub fn read_profile(path: &Path) -> Result<(Vec<u8>, Profile)> {
    let parse_err = |reason: String| BenchError::ProfileParse {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| parse_err(e.to_string()))?;
    let profile = decode(&bytes).map_err(|e| parse_err(e.to_string()))?;
    Ok((bytes, profile))
}
