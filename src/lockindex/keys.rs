//! Key construction and parsing for lock records and index entries.
//!
//! Index entries use a composite key: NUL-delimited segments starting with a
//! fixed object-type tag, so that entries for one request form a contiguous,
//! lexicographically ordered key range. NUL cannot appear in contract names,
//! resource keys, or request IDs, which keeps the encoding unambiguous.

/// Object-type tag of the request→lock index keyspace.
const LOCK_INDEX_OBJECT: &str = "requestId~lockId";

/// Composite-key segment delimiter.
const DELIM: char = '\u{0}';

/// Value stored under index entries. The entry's existence is the data.
pub(crate) const INDEX_SENTINEL: &[u8] = &[0x00];

/// Compound lock ID: the unit of locking granularity.
pub fn lock_id(contract: &str, key: &str) -> String {
    format!("{contract}::{key}")
}

/// Split a compound lock ID back into `(contract, key)`.
pub fn split_lock_id(lock_id: &str) -> Option<(&str, &str)> {
    lock_id.split_once("::")
}

/// Composite index key for one lock held by one request.
pub(crate) fn index_key(request_id: &str, lock_id: &str) -> String {
    format!("{DELIM}{LOCK_INDEX_OBJECT}{DELIM}{request_id}{DELIM}{lock_id}{DELIM}")
}

/// Prefix covering every index entry belonging to `request_id`.
pub(crate) fn index_prefix(request_id: &str) -> String {
    format!("{DELIM}{LOCK_INDEX_OBJECT}{DELIM}{request_id}{DELIM}")
}

/// Parse a composite index key back into `(request_id, lock_id)`.
pub(crate) fn split_index_key(key: &str) -> Option<(&str, &str)> {
    let mut segments = key.strip_prefix(DELIM)?.split(DELIM);
    if segments.next()? != LOCK_INDEX_OBJECT {
        return None;
    }
    let request_id = segments.next()?;
    let lock_id = segments.next()?;
    // A well-formed key ends with a trailing delimiter, leaving one empty
    // segment and nothing after it.
    match (segments.next(), segments.next()) {
        (Some(""), None) => Some((request_id, lock_id)),
        _ => None,
    }
}
