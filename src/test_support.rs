//! Test doubles: an in-memory ledger transaction and a mock emissions
//! resource contract.
//!
//! [`MemoryLedger`] models the committed view one coordinator invocation
//! executes against: an ordered key-value map, a registry of invokable
//! resource contracts, a fixed caller identity, and a fixed invocation
//! timestamp. Commit-time concurrency control is the platform's job and is
//! not simulated; tests that need the "second writer loses" behavior replay
//! both invocations against the same committed state.
//!
//! [`MockEmissionsContract`] mimics an emissions-record registry: records
//! that already carry a minted token are filtered out of lock requests, so
//! the affected-key set it returns can be a strict subset of what was asked.

use crate::ledger::{CallerIdentity, InvokeResponse, LedgerFault, LedgerTransaction};
use crate::model::{ResourceInput, ResourceOutput};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A resource contract invokable from a [`MemoryLedger`].
pub(crate) trait ResourceContract {
    fn invoke(&mut self, method: &str, args: &[Vec<u8>]) -> InvokeResponse;
}

/// In-memory [`LedgerTransaction`].
pub(crate) struct MemoryLedger {
    states: BTreeMap<String, Vec<u8>>,
    contracts: HashMap<String, Box<dyn ResourceContract>>,
    caller: CallerIdentity,
    timestamp: i64,
}

impl MemoryLedger {
    pub(crate) fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            contracts: HashMap::new(),
            caller: CallerIdentity::new("auditor1", "user1"),
            timestamp: 1_700_000_000,
        }
    }

    pub(crate) fn set_caller(&mut self, organization: &str, common_name: &str) {
        self.caller = CallerIdentity::new(organization, common_name);
    }

    pub(crate) fn register_contract(
        &mut self,
        name: &str,
        contract: impl ResourceContract + 'static,
    ) {
        self.contracts.insert(name.to_string(), Box::new(contract));
    }

    /// Raw committed bytes under `key`, for worldstate assertions.
    pub(crate) fn state(&self, key: &str) -> Option<&[u8]> {
        self.states.get(key).map(Vec::as_slice)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.states.contains_key(key)
    }
}

impl LedgerTransaction for MemoryLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerFault> {
        Ok(self.states.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), LedgerFault> {
        self.states.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete_state(&mut self, key: &str) -> Result<(), LedgerFault> {
        self.states.remove(key);
        Ok(())
    }

    fn get_states_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerFault> {
        Ok(self
            .states
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn invoke_contract(
        &mut self,
        contract: &str,
        method: &str,
        args: &[Vec<u8>],
    ) -> Result<InvokeResponse, LedgerFault> {
        match self.contracts.get_mut(contract) {
            Some(target) => Ok(target.invoke(method, args)),
            None => Ok(InvokeResponse::error(format!(
                "contract {contract} not found"
            ))),
        }
    }

    fn caller(&self) -> Result<CallerIdentity, LedgerFault> {
        Ok(self.caller.clone())
    }

    fn tx_timestamp(&self) -> Result<i64, LedgerFault> {
        Ok(self.timestamp)
    }
}

/// Wrapper around a [`MemoryLedger`] that injects platform faults on demand:
/// refuse reads, refuse scans, refuse deletes, or allow only the first N
/// writes. Contract invocation and identity pass through untouched.
pub(crate) struct FaultyLedger {
    inner: MemoryLedger,
    puts_allowed: Option<usize>,
    fail_gets: bool,
    fail_scans: bool,
    fail_deletes: bool,
}

impl FaultyLedger {
    pub(crate) fn new(inner: MemoryLedger) -> Self {
        Self {
            inner,
            puts_allowed: None,
            fail_gets: false,
            fail_scans: false,
            fail_deletes: false,
        }
    }

    /// Allow `writes` calls to `put_state`, then fault every later one.
    pub(crate) fn fail_puts_after(mut self, writes: usize) -> Self {
        self.puts_allowed = Some(writes);
        self
    }

    pub(crate) fn fail_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }

    pub(crate) fn fail_scans(mut self) -> Self {
        self.fail_scans = true;
        self
    }

    pub(crate) fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub(crate) fn inner(&self) -> &MemoryLedger {
        &self.inner
    }
}

impl LedgerTransaction for FaultyLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerFault> {
        if self.fail_gets {
            return Err(LedgerFault("state read refused".into()));
        }
        self.inner.get_state(key)
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), LedgerFault> {
        if let Some(allowed) = self.puts_allowed.as_mut() {
            if *allowed == 0 {
                return Err(LedgerFault("state write refused".into()));
            }
            *allowed -= 1;
        }
        self.inner.put_state(key, value)
    }

    fn delete_state(&mut self, key: &str) -> Result<(), LedgerFault> {
        if self.fail_deletes {
            return Err(LedgerFault("state delete refused".into()));
        }
        self.inner.delete_state(key)
    }

    fn get_states_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerFault> {
        if self.fail_scans {
            return Err(LedgerFault("state scan refused".into()));
        }
        self.inner.get_states_by_prefix(prefix)
    }

    fn invoke_contract(
        &mut self,
        contract: &str,
        method: &str,
        args: &[Vec<u8>],
    ) -> Result<InvokeResponse, LedgerFault> {
        self.inner.invoke_contract(contract, method, args)
    }

    fn caller(&self) -> Result<CallerIdentity, LedgerFault> {
        self.inner.caller()
    }

    fn tx_timestamp(&self) -> Result<i64, LedgerFault> {
        self.inner.tx_timestamp()
    }
}

/// One emissions record in the mock registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmissionsRecord {
    pub uuid: String,
    pub party_id: String,
    pub token_id: String,
}

/// Parameters of the mock's `updateEmissionsWithToken` method.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTokenParams {
    pub token_id: String,
    pub party_id: String,
}

/// Mock emissions-record registry contract.
pub(crate) struct MockEmissionsContract {
    records: BTreeMap<String, EmissionsRecord>,
}

impl MockEmissionsContract {
    /// `count` records named `uuid-1..uuid-count`; the UUIDs in `minted`
    /// already carry a token and are filtered out of lock requests.
    pub(crate) fn with_records(count: usize, minted: &[&str]) -> Self {
        let mut records = BTreeMap::new();
        for i in 1..=count {
            let uuid = format!("uuid-{i}");
            let token_id = if minted.contains(&uuid.as_str()) {
                format!("token-{i}")
            } else {
                String::new()
            };
            records.insert(
                uuid.clone(),
                EmissionsRecord {
                    uuid,
                    party_id: String::new(),
                    token_id,
                },
            );
        }
        Self { records }
    }

    pub(crate) fn record(&self, uuid: &str) -> Option<&EmissionsRecord> {
        self.records.get(uuid)
    }

    fn get_valid_emissions(&self, input: &ResourceInput) -> InvokeResponse {
        let mut valid = Vec::new();
        for uuid in &input.keys {
            let Some(record) = self.records.get(uuid) else {
                return InvokeResponse::error(format!(
                    "emissions record with uuid = {uuid} not found"
                ));
            };
            if record.token_id.is_empty() {
                valid.push(record.clone());
            }
        }

        let valid_uuids: Vec<&str> = valid.iter().map(|r| r.uuid.as_str()).collect();
        let mut output_to_store = BTreeMap::new();
        output_to_store.insert(
            "validUUIDs".to_string(),
            encode_b64_json(&valid_uuids),
        );
        let output = ResourceOutput {
            keys: valid_uuids.iter().map(|s| s.to_string()).collect(),
            output_to_client: encode_b64_json(&valid),
            output_to_store,
        };
        InvokeResponse::ok(serde_json::to_vec(&output).unwrap())
    }

    fn update_with_token(&mut self, input: &ResourceInput) -> InvokeResponse {
        let params: UpdateTokenParams = match serde_json::from_value(input.params.clone()) {
            Ok(params) => params,
            Err(e) => return InvokeResponse::error(format!("bad update params: {e}")),
        };
        for uuid in &input.keys {
            let Some(record) = self.records.get_mut(uuid) else {
                return InvokeResponse::error(format!("{uuid} emissions not found"));
            };
            record.token_id = params.token_id.clone();
            record.party_id = params.party_id.clone();
        }
        let output = ResourceOutput {
            keys: input.keys.clone(),
            ..Default::default()
        };
        InvokeResponse::ok(serde_json::to_vec(&output).unwrap())
    }
}

impl ResourceContract for MockEmissionsContract {
    fn invoke(&mut self, method: &str, args: &[Vec<u8>]) -> InvokeResponse {
        let Some(input) = args
            .first()
            .and_then(|raw| serde_json::from_slice::<ResourceInput>(raw).ok())
        else {
            return InvokeResponse::error("bad resource input envelope");
        };
        match method {
            "getValidEmissions" => self.get_valid_emissions(&input),
            "updateEmissionsWithToken" => self.update_with_token(&input),
            // Returns a payload that is not a valid output envelope.
            "invalidEnvelope" => InvokeResponse::ok(b"not an envelope".to_vec()),
            _ => InvokeResponse::error(format!("method {method} not supported")),
        }
    }
}

/// A ledger with a registered `EmissionsCC` holding `count` records, of
/// which `minted` already carry tokens.
pub(crate) fn ledger_with_emissions(count: usize, minted: &[&str]) -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    ledger.register_contract("EmissionsCC", MockEmissionsContract::with_records(count, minted));
    ledger
}

pub(crate) fn encode_b64_json<T: Serialize>(value: &T) -> String {
    BASE64.encode(serde_json::to_vec(value).unwrap())
}

pub(crate) fn decode_b64_json<T: DeserializeOwned>(encoded: &str) -> T {
    serde_json::from_slice(&BASE64.decode(encoded).unwrap()).unwrap()
}
