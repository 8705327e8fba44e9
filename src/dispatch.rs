//! Operation dispatch: the coordinator's single entry point.
//!
//! [`Coordinator::invoke`] is the boundary between the hosting ledger runtime
//! and the rest of the crate. It never returns `Err`: every failure is logged
//! once at the severity the error carries, then surfaced to the caller as an
//! error response whose message is the rendered operation trail.
//!
//! The bracket operations (`startProcessing`, `endProcessing`,
//! `getTransactionDetails`) exist only under the bracketed entry mode;
//! everything else is available in both modes.

use crate::config::{CoordinatorConfig, EntryMode};
use crate::error::{Error, Result, Severity};
use crate::ledger::{InvokeResponse, LedgerTransaction};
use crate::lockindex;
use crate::manager;
use crate::model::StageUpdateInput;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Entry point routing named operations to their implementations.
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run one invocation. Failures come back as an error response, never as
    /// a panic or a Rust error.
    pub fn invoke(
        &self,
        ctx: &mut dyn LedgerTransaction,
        operation: &str,
        args: &[Vec<u8>],
    ) -> InvokeResponse {
        match self.dispatch(ctx, operation, args) {
            Ok(payload) => InvokeResponse::ok(payload),
            Err(err) => {
                log_failure(operation, &err);
                InvokeResponse::error(err.to_string())
            }
        }
    }

    fn dispatch(
        &self,
        ctx: &mut dyn LedgerTransaction,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        match operation {
            "stageUpdate" => {
                let raw = single_arg(args)?;
                let input: StageUpdateInput = serde_json::from_slice(raw).map_err(|e| {
                    Error::invalid_input(format!("failed to parse stage update input: {e}"))
                })?;
                let output = manager::stage_update(ctx, &self.config, input)?;
                to_payload(&output)
            }
            "getRequest" => {
                let id = id_arg(args)?;
                let request = manager::get_request(ctx, id)?;
                to_payload(&request)
            }
            "getAllLocksForRequest" => {
                let id = id_arg(args)?;
                let held = lockindex::all_held_by(ctx, id)?;
                to_payload(&held)
            }
            "startProcessing" => {
                self.require_bracketed(operation)?;
                let id = id_arg(args)?;
                let request = manager::start_processing(ctx, id)?;
                to_payload(&request)
            }
            "endProcessing" => {
                self.require_bracketed(operation)?;
                let id = id_arg(args)?;
                let request = manager::end_processing(ctx, id)?;
                to_payload(&request)
            }
            // Kept as an alias of getRequest for callers of the bracketed
            // protocol generation.
            "getTransactionDetails" => {
                self.require_bracketed(operation)?;
                let id = id_arg(args)?;
                let request = manager::get_request(ctx, id)?;
                to_payload(&request)
            }
            _ => Err(Error::invalid_input(format!(
                "operation {operation} not supported"
            ))),
        }
    }

    fn require_bracketed(&self, operation: &str) -> Result<()> {
        if self.config.entry_mode != EntryMode::Bracketed {
            return Err(Error::invalid_input(format!(
                "operation {operation} is not supported in {} entry mode",
                self.config.entry_mode.as_str()
            )));
        }
        Ok(())
    }
}

fn log_failure(operation: &str, err: &Error) {
    let kind = err.kind().as_str();
    let request_id = err.request_id().unwrap_or("");
    let contract = err.contract().unwrap_or("");
    match err.severity() {
        Severity::Error => error!(operation, kind, request_id, contract, "{err}"),
        Severity::Warn => warn!(operation, kind, request_id, contract, "{err}"),
        Severity::Info => info!(operation, kind, request_id, contract, "{err}"),
        Severity::Debug => debug!(operation, kind, request_id, contract, "{err}"),
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| Error::unexpected(format!("failed to serialize response: {e}")))
}

fn single_arg(args: &[Vec<u8>]) -> Result<&[u8]> {
    match args {
        [arg] => Ok(arg),
        _ => Err(Error::invalid_input(format!(
            "invalid number of inputs, require 1, but provided {}",
            args.len()
        ))),
    }
}

fn id_arg(args: &[Vec<u8>]) -> Result<&str> {
    let raw = single_arg(args)?;
    let id = std::str::from_utf8(raw)
        .map_err(|_| Error::invalid_input("request id must be valid UTF-8"))?;
    if id.trim().is_empty() {
        return Err(Error::invalid_input("require non empty requestId"));
    }
    Ok(id)
}
