//! Backup file names and object keys
//!
//! `backup_{ts}.json` where `ts` is the creation instant in RFC 3339 UTC with
//! milliseconds and `:`/`.` replaced by `-`, e.g.
//! `backup_2025-01-15T10-30-00-123Z.json`. The mapping is exactly reversible
//! for millisecond instants.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::constants::snapshot::{BACKUPS_SEGMENT, FILE_PREFIX, FILE_SUFFIX};
use crate::errors::SnapshotError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

pub fn file_name_for(created_at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        FILE_PREFIX,
        created_at.format(TIMESTAMP_FORMAT),
        FILE_SUFFIX
    )
}

/// Creation instant encoded in a file name; `None` for anything malformed.
pub fn parse_file_name(file_name: &str) -> Option<DateTime<Utc>> {
    let timestamp = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?;
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// `backup_*.json` with no path separators. The timestamp may be malformed;
/// such files are still listable and deletable.
pub fn validate_file_name(file_name: &str) -> Result<(), SnapshotError> {
    let well_formed = file_name.starts_with(FILE_PREFIX)
        && file_name.ends_with(FILE_SUFFIX)
        && file_name.len() > FILE_PREFIX.len() + FILE_SUFFIX.len()
        && !file_name.contains(['/', '\\'])
        && !file_name.contains("..");

    if well_formed {
        Ok(())
    } else {
        Err(SnapshotError::InvalidFileName(file_name.to_string()))
    }
}

/// Tenant ids become the first key segment, so they must be a single
/// plain segment.
pub fn validate_tenant(tenant_id: &str) -> Result<(), SnapshotError> {
    let valid = !tenant_id.is_empty()
        && tenant_id != "."
        && tenant_id != ".."
        && !tenant_id.contains(['/', '\\'])
        && !tenant_id.chars().any(char::is_control);

    if valid {
        Ok(())
    } else {
        Err(SnapshotError::InvalidTenant(tenant_id.to_string()))
    }
}

/// `{tenant}/backups/`
pub fn backups_prefix(tenant_id: &str) -> String {
    format!("{}/{}/", tenant_id, BACKUPS_SEGMENT)
}

/// `{tenant}/backups/{file}`
pub fn object_key(tenant_id: &str, file_name: &str) -> String {
    format!("{}{}", backups_prefix(tenant_id), file_name)
}
