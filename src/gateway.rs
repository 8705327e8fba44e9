//! Resource Invocation Gateway.
//!
//! Thin protocol adapter between the coordinator and a resource contract:
//! serialize the fixed input envelope, invoke the named method synchronously
//! within the enclosing transaction, parse the fixed output envelope.
//!
//! A callee's non-success status is its business rules rejecting the call,
//! so it surfaces as [`Conflict`](crate::error::ErrorKind::Conflict), not
//! something this layer retries. A payload that does not parse as the
//! envelope is a protocol violation by the callee and surfaces the same way.

use crate::error::{Error, Result};
use crate::ledger::LedgerTransaction;
use crate::model::{ResourceInput, ResourceOutput};
use tracing::debug;

const OP: &str = "Gateway.invoke";

/// Invoke `method` on `contract` with the given input envelope and parse the
/// response envelope.
pub fn invoke_resource(
    ctx: &mut dyn LedgerTransaction,
    contract: &str,
    method: &str,
    input: &ResourceInput,
) -> Result<ResourceOutput> {
    let payload = serde_json::to_vec(input).map_err(|e| {
        Error::unexpected(format!("failed to serialize resource input: {e}"))
            .at(OP)
            .with_contract(contract)
    })?;

    debug!(contract, method, keys = input.keys.len(), "invoking resource contract");
    let response = ctx
        .invoke_contract(contract, method, &[payload])
        .map_err(|e| {
            Error::unexpected(format!("failed to invoke resource contract: {e}"))
                .at(OP)
                .with_contract(contract)
        })?;

    if !response.is_ok() {
        return Err(Error::conflict(format!(
            "resource contract rejected the call: {}",
            response.message
        ))
        .at(OP)
        .with_contract(contract));
    }

    serde_json::from_slice(&response.payload).map_err(|e| {
        Error::conflict(format!("invalid response envelope from resource contract: {e}"))
            .at(OP)
            .with_contract(contract)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{decode_b64_json, ledger_with_emissions, EmissionsRecord};

    fn input(keys: &[&str]) -> ResourceInput {
        ResourceInput {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn returns_parsed_envelope_on_success() {
        let mut ledger = ledger_with_emissions(3, &[]);
        let output = invoke_resource(
            &mut ledger,
            "EmissionsCC",
            "getValidEmissions",
            &input(&["uuid-1", "uuid-2"]),
        )
        .unwrap();

        assert_eq!(output.keys, ["uuid-1", "uuid-2"]);
        let records: Vec<EmissionsRecord> = decode_b64_json(&output.output_to_client);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn business_rejection_is_conflict_with_callee_message() {
        let mut ledger = ledger_with_emissions(3, &[]);
        let err = invoke_resource(
            &mut ledger,
            "EmissionsCC",
            "getValidEmissions",
            &input(&["uuid-99"]),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.contract(), Some("EmissionsCC"));
        assert!(err.to_string().contains("uuid-99 not found"));
    }

    #[test]
    fn unknown_method_is_conflict() {
        let mut ledger = ledger_with_emissions(1, &[]);
        let err = invoke_resource(&mut ledger, "EmissionsCC", "noSuchMethod", &input(&[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn unparseable_payload_is_conflict() {
        let mut ledger = ledger_with_emissions(1, &[]);
        let err = invoke_resource(&mut ledger, "EmissionsCC", "invalidEnvelope", &input(&[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("invalid response envelope"));
    }

    #[test]
    fn unknown_contract_is_conflict() {
        let mut ledger = ledger_with_emissions(1, &[]);
        let err = invoke_resource(&mut ledger, "NoSuchCC", "getValidEmissions", &input(&[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("NoSuchCC not found"));
    }
}
