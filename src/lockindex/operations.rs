//! Lock Index read and write operations.

use super::keys;
use super::types::HeldLock;
use crate::error::{Error, Result};
use crate::ledger::LedgerTransaction;

/// Check whether a lock record is present for `(contract, key)`.
pub fn exists(ctx: &dyn LedgerTransaction, contract: &str, key: &str) -> Result<bool> {
    const OP: &str = "LockIndex.exists";
    let lock_id = keys::lock_id(contract, key);
    let raw = ctx.get_state(&lock_id).map_err(|e| {
        Error::unexpected(format!("failed to get lock state: {e}"))
            .at(OP)
            .with_contract(contract)
    })?;
    Ok(raw.is_some_and(|v| !v.is_empty()))
}

/// Owning request ID for `(contract, key)`, or `None` when the key is not
/// locked. Absence is data, not an error: callers decide what an unlocked
/// key means for them.
pub fn owner_of(ctx: &dyn LedgerTransaction, contract: &str, key: &str) -> Result<Option<String>> {
    const OP: &str = "LockIndex.ownerOf";
    let lock_id = keys::lock_id(contract, key);
    let raw = ctx.get_state(&lock_id).map_err(|e| {
        Error::unexpected(format!("failed to get lock state: {e}"))
            .at(OP)
            .with_contract(contract)
    })?;
    match raw {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => {
            let owner = String::from_utf8(v).map_err(|_| {
                Error::unexpected("lock owner is not valid UTF-8")
                    .at(OP)
                    .with_contract(contract)
            })?;
            Ok(Some(owner))
        }
    }
}

/// Record `(contract, key)` as locked by `request_id`: writes the lock record
/// and its index entry.
///
/// The caller must have verified the key is free within the same atomic
/// invocation; acquire does not re-check.
pub fn acquire(
    ctx: &mut dyn LedgerTransaction,
    request_id: &str,
    contract: &str,
    key: &str,
) -> Result<()> {
    const OP: &str = "LockIndex.acquire";
    let lock_id = keys::lock_id(contract, key);
    ctx.put_state(&lock_id, request_id.as_bytes()).map_err(|e| {
        Error::unexpected(format!("failed to put lock state: {e}"))
            .at(OP)
            .with_contract(contract)
            .with_request(request_id)
    })?;
    let index = keys::index_key(request_id, &lock_id);
    ctx.put_state(&index, keys::INDEX_SENTINEL).map_err(|e| {
        Error::unexpected(format!("failed to put lock index entry: {e}"))
            .at(OP)
            .with_contract(contract)
            .with_request(request_id)
    })?;
    Ok(())
}

/// Delete the lock record and index entry for `(contract, key)`.
///
/// Ownership is the caller's to verify before calling; release does not
/// re-check it.
pub fn release(
    ctx: &mut dyn LedgerTransaction,
    request_id: &str,
    contract: &str,
    key: &str,
) -> Result<()> {
    const OP: &str = "LockIndex.release";
    let lock_id = keys::lock_id(contract, key);
    ctx.delete_state(&lock_id).map_err(|e| {
        Error::unexpected(format!("failed to delete lock state: {e}"))
            .at(OP)
            .with_contract(contract)
            .with_request(request_id)
    })?;
    let index = keys::index_key(request_id, &lock_id);
    ctx.delete_state(&index).map_err(|e| {
        Error::unexpected(format!("failed to delete lock index entry: {e}"))
            .at(OP)
            .with_contract(contract)
            .with_request(request_id)
    })?;
    Ok(())
}

/// Every lock currently held by `request_id`, in index (lexicographic) order.
pub fn all_held_by(ctx: &dyn LedgerTransaction, request_id: &str) -> Result<Vec<HeldLock>> {
    const OP: &str = "LockIndex.allHeldBy";
    let prefix = keys::index_prefix(request_id);
    let entries = ctx.get_states_by_prefix(&prefix).map_err(|e| {
        Error::unexpected(format!("failed to scan lock index: {e}"))
            .at(OP)
            .with_request(request_id)
    })?;

    let mut out = Vec::with_capacity(entries.len());
    for (key, _) in entries {
        let (_, lock_id) = keys::split_index_key(&key).ok_or_else(|| {
            Error::unexpected(format!("malformed lock index entry: {key:?}"))
                .at(OP)
                .with_request(request_id)
        })?;
        let (contract, resource_key) = keys::split_lock_id(lock_id).ok_or_else(|| {
            Error::unexpected(format!("malformed lock ID in index entry: {lock_id:?}"))
                .at(OP)
                .with_request(request_id)
        })?;
        out.push(HeldLock {
            contract: contract.to_string(),
            key: resource_key.to_string(),
        });
    }
    Ok(out)
}
