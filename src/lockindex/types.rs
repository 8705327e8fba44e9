//! Lock enumeration types.

use serde::{Deserialize, Serialize};

/// One lock held by a request, parsed back from its compound lock ID.
///
/// Returned by [`super::all_held_by`] and serialized as the payload of the
/// `getAllLocksForRequest` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldLock {
    /// Resource contract owning the locked slice of state.
    pub contract: String,
    /// The locked resource key within that contract.
    pub key: String,
}
