// File: agent/src/types.rs
//! Wire types of the internal export/restore contract, shared by the
//! orchestrator and every domain service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::schema::Collection;

// === HEADERS ===

/// Internal-trust credential, recognised only inside the cluster.
pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

/// Tenant the call is scoped to.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Optional operator identity forwarded with a restore.
pub const OPERATOR_ID_HEADER: &str = "x-operator-id";
pub const OPERATOR_EMAIL_HEADER: &str = "x-operator-email";

// === RECORDS ===

/// One entity record. Its shape belongs to the owning service; the only field
/// anything outside that service relies on is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Stable id as a string. Numeric ids are accepted and rendered in decimal.
    pub fn id(&self) -> Option<String> {
        self.str_field("id")
    }

    /// A scalar reference field rendered as a string; `null` and absent are `None`.
    pub fn str_field(&self, field: &str) -> Option<String> {
        match self.0.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// An id array field such as `tagIds`.
    pub fn id_list(&self, field: &str) -> Vec<String> {
        let mut ids: Vec<String> = match self.0.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Tenant data keyed by collection, iterating in restore order.
pub type CollectionData = BTreeMap<Collection, Vec<Record>>;

/// Collection data as it travels on the wire (names as keys).
pub type WireCollections = BTreeMap<String, Vec<Record>>;

/// Split wire collections into known ones and the names nobody declared.
pub fn from_wire(wire: WireCollections) -> (CollectionData, Vec<String>) {
    let mut known = CollectionData::new();
    let mut unknown = Vec::new();
    for (name, records) in wire {
        match Collection::parse(&name) {
            Some(collection) => {
                known.insert(collection, records);
            }
            None => unknown.push(name),
        }
    }
    (known, unknown)
}

pub fn to_wire(data: &CollectionData) -> WireCollections {
    data.iter()
        .map(|(collection, records)| (collection.name().to_string(), records.clone()))
        .collect()
}

// === COUNTS ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounts {
    pub restored: u64,
    pub skipped: u64,
}

impl CollectionCounts {
    pub fn skipped(skipped: u64) -> Self {
        Self {
            restored: 0,
            skipped,
        }
    }
}

pub type RestoreCounts = BTreeMap<Collection, CollectionCounts>;

pub type WireCounts = BTreeMap<String, CollectionCounts>;

pub fn counts_to_wire(counts: &RestoreCounts) -> WireCounts {
    counts
        .iter()
        .map(|(collection, counts)| (collection.name().to_string(), *counts))
        .collect()
}

// === OPERATOR ===

/// The administrator performing a restore, as far as the caller knows them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorIdentity {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl OperatorIdentity {
    /// Operator identity from request headers; `None` when neither is present.
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let identity = Self {
            user_id: header(OPERATOR_ID_HEADER),
            email: header(OPERATOR_EMAIL_HEADER),
        };
        (!identity.is_empty()).then_some(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.email.is_none()
    }
}

// === RESPONSE STRUCTURES ===

/// Envelope of both internal endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ContractResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// `GET /internal/export`
pub type ExportResponse = ContractResponse<WireCollections>;

/// `POST /internal/restore`
pub type RestoreResponse = ContractResponse<WireCounts>;
