//! Staged-Transaction Manager: the request lifecycle and per-stage execution.
//!
//! A request is one durable record driven through a small state machine:
//!
//! - implicit entry mode: `absent → PROCESSING` on the first stage update,
//!   `PROCESSING → FINISHED` when a stage arrives marked last with stage
//!   state `FINISHED`. FINISHED is terminal.
//! - bracketed entry mode adds a resting state: [`start_processing`] opens a
//!   window (`absent`/`NOT_PROCESSING → PROCESSING`), [`end_processing`]
//!   closes it, and stage updates are accepted only inside a window.
//!
//! The caller identity captured at creation authorizes every later mutation:
//! exact match for CLIENT requests, organization-level match for
//! ORGANIZATION requests.
//!
//! A stage update executes all its lock calls, then all its free calls, and
//! persists the request exactly once at the end. Any single failure aborts
//! the whole update with the mutated record discarded unwritten; a stage is
//! never applied partially across contracts.

use crate::config::{CoordinatorConfig, EntryMode};
use crate::error::{Error, Result};
use crate::ledger::{CallerIdentity, LedgerTransaction};
use crate::locker;
use crate::model::{CallerType, Request, RequestState, StageUpdateInput, StageUpdateOutput};
use std::collections::BTreeMap;
use tracing::debug;

const STAGE_UPDATE_OP: &str = "Manager.stageUpdate";
const START_OP: &str = "Manager.startProcessing";
const END_OP: &str = "Manager.endProcessing";
const GET_OP: &str = "Manager.getRequest";

/// Stage state value that participates in the terminal transition.
const STAGE_STATE_FINISHED: &str = "FINISHED";

/// Apply one stage to a request: execute its lock and free calls, fold the
/// outputs into the record, and persist it.
pub fn stage_update(
    ctx: &mut dyn LedgerTransaction,
    config: &CoordinatorConfig,
    input: StageUpdateInput,
) -> Result<StageUpdateOutput> {
    let existing = load_request(ctx, &input.request_id, STAGE_UPDATE_OP)?;
    check_stage_update_input(&input, existing.is_some(), config.entry_mode)?;
    let identity = caller_identity(ctx, STAGE_UPDATE_OP, &input.request_id)?;

    let mut request = match existing {
        None => match config.entry_mode {
            EntryMode::Implicit => {
                debug!(request_id = %input.request_id, stage = %input.name,
                    "request not found, treating this as its first stage");
                create_request(ctx, &input, &identity)?
            }
            EntryMode::Bracketed => {
                return Err(Error::not_found("request not found")
                    .at(STAGE_UPDATE_OP)
                    .with_request(&input.request_id));
            }
        },
        Some(request) => {
            authorize(&request, &identity, STAGE_UPDATE_OP)?;
            match request.state {
                RequestState::Processing => request,
                RequestState::Finished => {
                    return Err(Error::conflict(format!(
                        "request {} is already in FINISHED state",
                        request.id
                    ))
                    .at(STAGE_UPDATE_OP)
                    .with_request(&request.id));
                }
                RequestState::NotProcessing => {
                    return Err(Error::conflict(format!(
                        "request {} is not in PROCESSING state, found NOT_PROCESSING",
                        request.id
                    ))
                    .at(STAGE_UPDATE_OP)
                    .with_request(&request.id));
                }
            }
        }
    };

    request.current_stage_name = input.name.clone();
    request.current_stage_state = input.stage_state.clone();

    let mut output = StageUpdateOutput::default();

    debug!(request_id = %request.id, stage = %input.name, "executing data lock calls");
    for (contract, call) in &input.data_locks {
        let (to_store, to_client) = locker::lock(ctx, &request.id, contract, call)
            .map_err(|e| e.at(STAGE_UPDATE_OP))?;
        fold_outcome(&mut request, &input.name, contract, to_store);
        if !to_client.is_empty() {
            output.data_locks.insert(contract.clone(), to_client);
        }
    }

    debug!(request_id = %request.id, stage = %input.name, "executing data free calls");
    for (contract, call) in &input.data_free {
        let (to_store, to_client) = locker::unlock(ctx, &request.id, contract, call)
            .map_err(|e| e.at(STAGE_UPDATE_OP))?;
        fold_outcome(&mut request, &input.name, contract, to_store);
        if !to_client.is_empty() {
            output.data_free.insert(contract.clone(), to_client);
        }
    }

    if !input.blockchain_data.is_empty() {
        request
            .stage_entry(&input.name)
            .blockchain_data
            .extend(input.blockchain_data.iter().cloned());
    }

    if input.is_last && input.stage_state == STAGE_STATE_FINISHED {
        request.state = RequestState::Finished;
    }

    store_request(ctx, &request, STAGE_UPDATE_OP)?;
    Ok(output)
}

/// Open a processing window (bracketed entry mode).
///
/// Creates the request when unseen; resumes it from NOT_PROCESSING
/// otherwise. Already PROCESSING or FINISHED requests cannot be started.
pub fn start_processing(ctx: &mut dyn LedgerTransaction, id: &str) -> Result<Request> {
    let identity = caller_identity(ctx, START_OP, id)?;
    match load_request(ctx, id, START_OP)? {
        None => {
            let created_at = ctx.tx_timestamp().map_err(|e| {
                Error::unexpected(format!("failed to read invocation timestamp: {e}"))
                    .at(START_OP)
                    .with_request(id)
            })?;
            // Bracket operations carry no caller-type choice; windows are
            // resumable by anyone in the creating organization.
            let request = Request {
                id: id.to_string(),
                state: RequestState::Processing,
                current_stage_name: String::new(),
                current_stage_state: String::new(),
                caller_type: CallerType::Organization,
                caller_id: identity.organization.clone(),
                created_at,
                stage_data: BTreeMap::new(),
            };
            store_request(ctx, &request, START_OP)?;
            Ok(request)
        }
        Some(mut request) => {
            authorize(&request, &identity, START_OP)?;
            match request.state {
                RequestState::Finished => Err(Error::conflict(format!(
                    "request {id} is already in FINISHED state"
                ))
                .at(START_OP)
                .with_request(id)),
                RequestState::Processing => Err(Error::conflict(format!(
                    "request {id} is already in PROCESSING state"
                ))
                .at(START_OP)
                .with_request(id)),
                RequestState::NotProcessing => {
                    request.state = RequestState::Processing;
                    store_request(ctx, &request, START_OP)?;
                    Ok(request)
                }
            }
        }
    }
}

/// Close a processing window (bracketed entry mode).
///
/// Ending an already FINISHED request succeeds as a no-op; the terminal
/// state wins over the bracket.
pub fn end_processing(ctx: &mut dyn LedgerTransaction, id: &str) -> Result<Request> {
    let identity = caller_identity(ctx, END_OP, id)?;
    let Some(mut request) = load_request(ctx, id, END_OP)? else {
        return Err(Error::not_found("request not found")
            .at(END_OP)
            .with_request(id));
    };
    authorize(&request, &identity, END_OP)?;
    match request.state {
        RequestState::Finished => Ok(request),
        RequestState::NotProcessing => Err(Error::conflict(format!(
            "request {id} is not in PROCESSING state, found NOT_PROCESSING"
        ))
        .at(END_OP)
        .with_request(id)),
        RequestState::Processing => {
            request.state = RequestState::NotProcessing;
            store_request(ctx, &request, END_OP)?;
            Ok(request)
        }
    }
}

/// Read-only fetch of a persisted request.
pub fn get_request(ctx: &dyn LedgerTransaction, id: &str) -> Result<Request> {
    load_request(ctx, id, GET_OP)?.ok_or_else(|| {
        Error::not_found("request not found")
            .at(GET_OP)
            .with_request(id)
    })
}

fn fold_outcome(
    request: &mut Request,
    stage_name: &str,
    contract: &str,
    to_store: BTreeMap<String, String>,
) {
    if !to_store.is_empty() {
        request
            .stage_entry(stage_name)
            .outputs
            .insert(contract.to_string(), to_store);
    }
}

fn create_request(
    ctx: &dyn LedgerTransaction,
    input: &StageUpdateInput,
    identity: &CallerIdentity,
) -> Result<Request> {
    let caller_type = input.caller_type.ok_or_else(|| {
        Error::invalid_input("require non empty callerType for first stage")
            .at(STAGE_UPDATE_OP)
            .with_request(&input.request_id)
    })?;
    let created_at = ctx.tx_timestamp().map_err(|e| {
        Error::unexpected(format!("failed to read invocation timestamp: {e}"))
            .at(STAGE_UPDATE_OP)
            .with_request(&input.request_id)
    })?;
    Ok(Request {
        id: input.request_id.clone(),
        state: RequestState::Processing,
        current_stage_name: String::new(),
        current_stage_state: String::new(),
        caller_type,
        caller_id: caller_id_for(caller_type, identity),
        created_at,
        stage_data: BTreeMap::new(),
    })
}

fn caller_id_for(caller_type: CallerType, identity: &CallerIdentity) -> String {
    match caller_type {
        CallerType::Client => {
            format!("{}::{}", identity.organization, identity.common_name)
        }
        CallerType::Organization => identity.organization.clone(),
    }
}

/// Verify the invocation's caller may mutate `request`.
fn authorize(request: &Request, identity: &CallerIdentity, op: &'static str) -> Result<()> {
    let presented = caller_id_for(request.caller_type, identity);
    if presented != request.caller_id {
        let message = match request.caller_type {
            CallerType::Client => "wrong caller, only the creating client can update the request",
            CallerType::Organization => {
                "wrong caller, only the creating organization can update the request"
            }
        };
        return Err(Error::conflict(message).at(op).with_request(&request.id));
    }
    Ok(())
}

fn check_stage_update_input(
    input: &StageUpdateInput,
    exists: bool,
    entry_mode: EntryMode,
) -> Result<()> {
    let check = |ok: bool, message: &str| {
        if ok {
            Ok(())
        } else {
            Err(Error::invalid_input(message).at(STAGE_UPDATE_OP))
        }
    };
    check(
        !input.request_id.trim().is_empty(),
        "require non empty requestId",
    )?;
    check(!input.name.trim().is_empty(), "require non empty stage name")?;
    check(
        !input.stage_state.trim().is_empty(),
        "require non empty stageState",
    )?;
    if entry_mode == EntryMode::Implicit && !exists {
        check(
            input.caller_type.is_some(),
            "require non empty callerType for first stage",
        )?;
    }
    Ok(())
}

fn caller_identity(
    ctx: &dyn LedgerTransaction,
    op: &'static str,
    request_id: &str,
) -> Result<CallerIdentity> {
    ctx.caller().map_err(|e| {
        Error::unexpected(format!("failed to resolve caller identity: {e}"))
            .at(op)
            .with_request(request_id)
    })
}

fn load_request(
    ctx: &dyn LedgerTransaction,
    id: &str,
    op: &'static str,
) -> Result<Option<Request>> {
    let raw = ctx.get_state(id).map_err(|e| {
        Error::unexpected(format!("failed to get request: {e}"))
            .at(op)
            .with_request(id)
    })?;
    match raw {
        None => Ok(None),
        Some(raw) => {
            let request = serde_json::from_slice(&raw).map_err(|e| {
                Error::unexpected(format!("failed to parse stored request: {e}"))
                    .at(op)
                    .with_request(id)
            })?;
            Ok(Some(request))
        }
    }
}

fn store_request(ctx: &mut dyn LedgerTransaction, request: &Request, op: &'static str) -> Result<()> {
    let raw = serde_json::to_vec(request).map_err(|e| {
        Error::unexpected(format!("failed to serialize request: {e}"))
            .at(op)
            .with_request(&request.id)
    })?;
    ctx.put_state(&request.id, &raw).map_err(|e| {
        Error::unexpected(format!("failed to put request: {e}"))
            .at(op)
            .with_request(&request.id)
    })
}
