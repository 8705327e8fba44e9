//! The lock/unlock protocol: check, invoke, record.
//!
//! Both operations sandwich the resource-contract call between a pre-check
//! against the Lock Index and a post-commit of the index:
//!
//! - no lock is taken speculatively before the contract's business
//!   validation has passed, and
//! - the set of keys actually locked or freed is the set the contract says
//!   it affected, never merely what the caller requested.
//!
//! A pre-check failure is a clean [`Conflict`](crate::error::ErrorKind::Conflict)
//! with nothing done. A storage fault after the contract has already
//! recorded its side effect is a different animal: the inconsistency cannot
//! be repaired at this layer, so it surfaces as
//! [`Unexpected`](crate::error::ErrorKind::Unexpected) for the operator and
//! the platform discards the whole invocation.

use crate::error::{Error, Result};
use crate::gateway;
use crate::ledger::LedgerTransaction;
use crate::lockindex;
use crate::model::ResourceCall;
use std::collections::BTreeMap;
use tracing::debug;

/// Stored outputs and client payload returned by one lock/unlock call.
pub type LockOutcome = (BTreeMap<String, String>, String);

/// Lock data on `contract` for `request_id`.
///
/// Every requested key must be free; the keys actually locked are the ones
/// the contract reports affected.
pub fn lock(
    ctx: &mut dyn LedgerTransaction,
    request_id: &str,
    contract: &str,
    call: &ResourceCall,
) -> Result<LockOutcome> {
    const OP: &str = "Locker.lock";

    debug!(request_id, contract, "checking requested keys are free");
    for key in &call.input.keys {
        let held = lockindex::exists(ctx, contract, key)
            .map_err(|e| e.at(OP).with_request(request_id))?;
        if held {
            return Err(Error::conflict(format!("key = {key} already locked"))
                .at(OP)
                .with_contract(contract)
                .with_request(request_id));
        }
    }

    let output = gateway::invoke_resource(ctx, contract, &call.method, &call.input)
        .map_err(|e| e.at(OP).with_request(request_id))?;

    debug!(request_id, contract, keys = ?output.keys, "locking affected keys");
    for key in &output.keys {
        lockindex::acquire(ctx, request_id, contract, key)
            .map_err(|e| e.at(OP).with_contract(contract))?;
    }

    Ok((output.output_to_store, output.output_to_client))
}

/// Free data on `contract` previously locked by `request_id`.
///
/// Every requested key must be locked by this very request; the keys
/// actually freed are the ones the contract reports affected.
pub fn unlock(
    ctx: &mut dyn LedgerTransaction,
    request_id: &str,
    contract: &str,
    call: &ResourceCall,
) -> Result<LockOutcome> {
    const OP: &str = "Locker.unlock";

    debug!(request_id, contract, "checking requested keys are held by this request");
    for key in &call.input.keys {
        let owner = lockindex::owner_of(ctx, contract, key)
            .map_err(|e| e.at(OP).with_request(request_id))?;
        // Unlocked counts as "not ours" too.
        if owner.as_deref() != Some(request_id) {
            return Err(
                Error::conflict(format!("data not locked for request = {request_id}"))
                    .at(OP)
                    .with_contract(contract)
                    .with_request(request_id),
            );
        }
    }

    let output = gateway::invoke_resource(ctx, contract, &call.method, &call.input)
        .map_err(|e| e.at(OP).with_request(request_id))?;

    debug!(request_id, contract, keys = ?output.keys, "freeing affected keys");
    for key in &output.keys {
        lockindex::release(ctx, request_id, contract, key)
            .map_err(|e| e.at(OP).with_contract(contract))?;
    }

    Ok((output.output_to_store, output.output_to_client))
}
