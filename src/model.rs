//! Persisted records and protocol envelopes.
//!
//! Everything here is JSON on the wire and in the ledger, with camelCase
//! field names. Two families live in this module:
//!
//! - the durable [`Request`] record and its per-stage accumulation
//!   ([`StageData`], [`BlockchainData`]);
//! - the protocol envelopes: what callers submit ([`StageUpdateInput`]) and
//!   receive ([`StageUpdateOutput`]), and the fixed input/output shapes
//!   exchanged with resource contracts ([`ResourceInput`],
//!   [`ResourceOutput`]).
//!
//! Resource-contract parameters stay an opaque [`serde_json::Value`]: only
//! the invoked contract interprets them, the coordinator merely checks they
//! parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Overall state of a request.
///
/// `NotProcessing` is reachable only under the bracketed entry mode, as the
/// resting state between `startProcessing`/`endProcessing` windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "NOT_PROCESSING")]
    NotProcessing,
    #[serde(rename = "FINISHED")]
    Finished,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Processing => "PROCESSING",
            RequestState::NotProcessing => "NOT_PROCESSING",
            RequestState::Finished => "FINISHED",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may drive a request forward after its creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallerType {
    /// Only the exact individual (organization + common name) that created
    /// the request.
    #[serde(rename = "CLIENT")]
    Client,
    /// Anyone from the creating organization.
    #[serde(rename = "ORGANIZATION")]
    Organization,
}

/// The coordinator's durable record of one multi-stage business operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Caller-chosen identifier, also the record's ledger key.
    pub id: String,

    pub state: RequestState,

    /// Name of the last stage applied.
    #[serde(default)]
    pub current_stage_name: String,

    /// State of the last stage applied. `PROCESSING`, `FINISHED`, or a
    /// business-specific value the coordinator does not interpret.
    #[serde(default)]
    pub current_stage_state: String,

    pub caller_type: CallerType,

    /// Identity captured at creation: `org::commonName` for CLIENT callers,
    /// the organization alone for ORGANIZATION callers.
    pub caller_id: String,

    /// Epoch seconds of the invocation that created the record.
    pub created_at: i64,

    /// Accumulated data per stage, keyed by stage name. Insertion order is
    /// not significant; lookups are by name.
    #[serde(default)]
    pub stage_data: BTreeMap<String, StageData>,
}

impl Request {
    /// Stage entry for `name`, created empty on first touch. Entries are
    /// materialized lazily so stages that produce nothing leave no record.
    pub fn stage_entry(&mut self, name: &str) -> &mut StageData {
        self.stage_data.entry(name.to_string()).or_default()
    }
}

/// Data accumulated while executing one stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageData {
    /// Caller-supplied records of assets created on other networks during
    /// this stage (e.g. a token minted on an EVM chain), stored verbatim for
    /// later stages to resolve.
    #[serde(default)]
    pub blockchain_data: Vec<BlockchainData>,

    /// Stored outputs returned by resource contracts during this stage:
    /// contract name → field name → base64 blob. Later stages read these
    /// back by stage name.
    #[serde(default)]
    pub outputs: BTreeMap<String, BTreeMap<String, String>>,
}

impl StageData {
    /// True when the stage produced nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.blockchain_data.is_empty() && self.outputs.is_empty()
    }
}

/// A cross-network receipt attached to a stage by the caller. Opaque to the
/// coordinator; only the caller's business logic resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainData {
    /// Network the asset lives on (e.g. `Fabric`, `Ethereum`).
    pub network: String,

    /// Address of the contract owning the asset, in whatever form the
    /// network uses.
    pub contract_address: String,

    /// Keys of the data or assets created there.
    #[serde(default)]
    pub keys_created: BTreeMap<String, String>,
}

/// Fixed input envelope handed to a resource contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInput {
    /// Keys the caller wants locked or freed. The contract decides which of
    /// them its business rules actually allow; see [`ResourceOutput::keys`].
    #[serde(default)]
    pub keys: Vec<String>,

    /// Method-specific parameters, opaque to the coordinator.
    #[serde(default)]
    pub params: Value,
}

/// Fixed output envelope returned by a resource contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOutput {
    /// The keys the contract actually affected, possibly a strict subset of
    /// the requested keys. Exactly this set gets locked or freed.
    #[serde(default)]
    pub keys: Vec<String>,

    /// Base64 payload forwarded to the invoking client unchanged.
    #[serde(default)]
    pub output_to_client: String,

    /// Base64 blobs to fold into the request's stage data, keyed by field
    /// name.
    #[serde(default)]
    pub output_to_store: BTreeMap<String, String>,
}

/// One resource-contract call requested by a stage: which method to run and
/// the envelope to hand it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCall {
    pub method: String,
    #[serde(default)]
    pub input: ResourceInput,
}

/// Caller-submitted description of one stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateInput {
    pub request_id: String,

    /// Stage name, unique per request by business convention.
    pub name: String,

    /// Stage state to record; `FINISHED` participates in the terminal
    /// transition together with `is_last`.
    pub stage_state: String,

    /// Required only on the update that creates the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_type: Option<CallerType>,

    /// Marks the final stage. The request reaches `FINISHED` when this is
    /// set and `stage_state` is `FINISHED`.
    #[serde(default)]
    pub is_last: bool,

    /// Resource contracts to lock data on, keyed by contract name.
    #[serde(default)]
    pub data_locks: BTreeMap<String, ResourceCall>,

    /// Resource contracts to free data on, keyed by contract name.
    #[serde(default)]
    pub data_free: BTreeMap<String, ResourceCall>,

    /// Cross-network receipts to append to this stage's record.
    #[serde(default)]
    pub blockchain_data: Vec<BlockchainData>,
}

/// Client payloads collected from the stage's resource-contract calls,
/// keyed by contract name. Empty payloads are omitted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateOutput {
    #[serde(default)]
    pub data_locks: BTreeMap<String, String>,
    #[serde(default)]
    pub data_free: BTreeMap<String, String>,
}
