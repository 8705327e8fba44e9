//! Collaborator traits for the ledger platform.
//!
//! The coordinator never talks to the platform directly; everything it needs
//! from one invocation (keyed state, prefix scans, cross-contract calls, the
//! authenticated caller, the invocation timestamp) is reached through a
//! [`LedgerTransaction`] handle supplied by the embedding process. All calls
//! are synchronous and scoped to the enclosing atomic unit of work: either
//! the whole invocation commits or none of its writes survive.
//!
//! Platform guarantees (consensus, MVCC validation at commit) are out of
//! scope here; the handle models the committed view the invocation executes
//! against.

use thiserror::Error;

/// Fault reported by the ledger platform itself: storage I/O, invocation
/// transport, credential extraction. Wrapped into
/// [`crate::error::Error::unexpected`] by whichever component hit it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LedgerFault(pub String);

/// Caller identity derived from the invocation's authenticated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Organization the credential was issued under.
    pub organization: String,
    /// Common name of the individual caller.
    pub common_name: String,
}

impl CallerIdentity {
    pub fn new(organization: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            common_name: common_name.into(),
        }
    }
}

/// Status of a contract invocation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeStatus {
    Ok,
    Error,
}

/// Fixed response envelope of a contract invocation: a status, an opaque
/// payload on success, a single message on failure. The coordinator's own
/// boundary answers in this shape too.
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    pub status: InvokeStatus,
    pub payload: Vec<u8>,
    pub message: String,
}

impl InvokeResponse {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: InvokeStatus::Ok,
            payload,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: InvokeStatus::Error,
            payload: Vec::new(),
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == InvokeStatus::Ok
    }
}

/// One atomic unit of work against the ledger platform.
///
/// Reads see the committed state the invocation was scheduled against; writes
/// are buffered into the invocation's write set and admitted (or discarded
/// wholesale) at the platform's commit-time validation.
pub trait LedgerTransaction {
    /// Fetch the value stored under `key`, or `None` if absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerFault>;

    /// Write `value` under `key`.
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), LedgerFault>;

    /// Delete `key`. Deleting an absent key is not a fault.
    fn delete_state(&mut self, key: &str) -> Result<(), LedgerFault>;

    /// All entries whose key starts with `prefix`, in lexicographic key order.
    fn get_states_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerFault>;

    /// Synchronously invoke `method` on another contract, sharing this
    /// transaction's atomicity and isolation boundary. A business rejection
    /// by the callee arrives as an error-status response, not as a fault.
    fn invoke_contract(
        &mut self,
        contract: &str,
        method: &str,
        args: &[Vec<u8>],
    ) -> Result<InvokeResponse, LedgerFault>;

    /// Identity of the invocation's authenticated caller.
    fn caller(&self) -> Result<CallerIdentity, LedgerFault>;

    /// Invocation timestamp as epoch seconds. Used only at request creation.
    fn tx_timestamp(&self) -> Result<i64, LedgerFault>;
}
