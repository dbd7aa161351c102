// File: orchestrator/src/snapshot/mod.rs

//! Tenant snapshot documents
//!
//! A snapshot is one JSON document holding every collection of one tenant at a
//! point in time:
//!
//! ```json
//! {
//!   "version": "2.0-msa",
//!   "description": "before migration",
//!   "createdAt": "2025-01-15T10:30:00.123Z",
//!   "tenantId": "acme",
//!   "data": { "users": [ ... ], "posts": [ ... ] }
//! }
//! ```
//!
//! # Versions
//!
//! Each version declares the collections it carries. Collections missing from
//! an older document are restored as empty; collections a version does not
//! declare are logged and ignored. A version nobody knows is rejected before
//! anything is touched.

pub mod naming;

use chrono::{DateTime, SubsecRound, Utc};
use domain_agent::schema::Collection;
use domain_agent::types::{from_wire, to_wire, CollectionData, WireCollections};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::constants::snapshot::{CURRENT_VERSION, LEGACY_VERSION};
use crate::errors::SnapshotError;

/// Record count per collection name.
pub type SnapshotStats = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotVersion {
    /// Single-store era: no bug reports or analytics.
    Legacy,
    /// One export per domain service.
    Msa,
}

const LEGACY_COLLECTIONS: &[Collection] = &[
    Collection::Users,
    Collection::Categories,
    Collection::Tags,
    Collection::Pages,
    Collection::Posts,
    Collection::Drafts,
    Collection::Comments,
    Collection::Bookmarks,
    Collection::Likes,
    Collection::Images,
];

impl SnapshotVersion {
    pub fn current() -> Self {
        SnapshotVersion::Msa
    }

    pub fn parse(version: &str) -> Result<Self, SnapshotError> {
        match version {
            LEGACY_VERSION => Ok(SnapshotVersion::Legacy),
            CURRENT_VERSION => Ok(SnapshotVersion::Msa),
            other => Err(SnapshotError::UnsupportedVersion(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotVersion::Legacy => LEGACY_VERSION,
            SnapshotVersion::Msa => CURRENT_VERSION,
        }
    }

    /// Collections this version declares, in restore order.
    pub fn collections(self) -> &'static [Collection] {
        match self {
            SnapshotVersion::Legacy => LEGACY_COLLECTIONS,
            SnapshotVersion::Msa => &Collection::ALL,
        }
    }

    pub fn declares(self, collection: Collection) -> bool {
        self.collections().contains(&collection)
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instants are always written with exactly three fractional digits.
pub mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(instant) => serializer.serialize_str(&super::format(instant)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

/// On-disk shape of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
    pub tenant_id: String,
    pub data: WireCollections,
}

/// A validated snapshot: known version, right tenant, every declared
/// collection present.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: SnapshotVersion,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tenant_id: String,
    pub data: CollectionData,
}

impl Snapshot {
    /// New snapshot in the current version. `created_at` is truncated to
    /// milliseconds so it survives the file name round trip.
    pub fn new(
        tenant_id: &str,
        description: Option<String>,
        created_at: DateTime<Utc>,
        mut data: CollectionData,
    ) -> Self {
        let version = SnapshotVersion::current();
        for collection in version.collections() {
            data.entry(*collection).or_default();
        }
        Self {
            version,
            description,
            created_at: created_at.trunc_subsecs(3),
            tenant_id: tenant_id.to_string(),
            data,
        }
    }

    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            version: self.version.as_str().to_string(),
            description: self.description.clone(),
            created_at: self.created_at,
            tenant_id: self.tenant_id.clone(),
            data: to_wire(&self.data),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(&self.to_document()).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Parse and validate a stored snapshot for `expected_tenant`.
    pub fn parse(bytes: &[u8], expected_tenant: &str) -> Result<Self, SnapshotError> {
        let document: SnapshotDocument =
            serde_json::from_slice(bytes).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        Self::from_document(document, expected_tenant)
    }

    pub fn from_document(document: SnapshotDocument, expected_tenant: &str) -> Result<Self, SnapshotError> {
        let version = SnapshotVersion::parse(&document.version)?;

        if document.tenant_id != expected_tenant {
            return Err(SnapshotError::TenantMismatch {
                expected: expected_tenant.to_string(),
                found: document.tenant_id,
            });
        }

        let (mut data, unknown) = from_wire(document.data);
        for name in unknown {
            warn!("Ignoring unknown collection '{}' in snapshot", name);
        }
        data.retain(|collection, _| {
            let declared = version.declares(*collection);
            if !declared {
                warn!(
                    "Ignoring collection '{}' not declared by snapshot version {}",
                    collection, version
                );
            }
            declared
        });
        for collection in version.collections() {
            data.entry(*collection).or_default();
        }

        Ok(Self {
            version,
            description: document.description,
            created_at: document.created_at,
            tenant_id: document.tenant_id,
            data,
        })
    }

    pub fn stats(&self) -> SnapshotStats {
        self.data
            .iter()
            .map(|(collection, records)| (collection.name().to_string(), records.len()))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}

/// Snapshot header plus per-collection counts, read without materializing
/// any record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub version: String,
    pub description: Option<String>,
    #[serde(default, with = "rfc3339_millis::option")]
    pub created_at: Option<DateTime<Utc>>,
    pub stats: SnapshotStats,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountingDocument {
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    data: BTreeMap<String, Vec<IgnoredAny>>,
}

impl SnapshotSummary {
    pub fn read(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let document: CountingDocument =
            serde_json::from_slice(bytes).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        Ok(Self {
            version: document.version,
            description: document.description,
            created_at: document.created_at,
            stats: document
                .data
                .into_iter()
                .map(|(name, records)| (name, records.len()))
                .collect(),
        })
    }
}

#[derive(Deserialize)]
struct DescriptionOnly {
    #[serde(default)]
    description: Option<String>,
}

/// Best-effort description lookup; anything unreadable has none.
pub fn read_description(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<DescriptionOnly>(bytes)
        .ok()
        .and_then(|d| d.description)
}
