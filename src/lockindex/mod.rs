//! Lock Index: the durable record of which request holds which resource key.
//!
//! Two kinds of entries, always written and deleted together inside the
//! enclosing ledger transaction:
//!
//! - **Lock record**: ledger key `contract::resourceKey`, value = owning
//!   request ID. Existence of the key is the lock; absence means free.
//! - **Index entry**: a composite key under the owning request's prefix
//!   with a one-byte sentinel value, existing only so that "all locks held
//!   by request X" is an ordered prefix scan instead of a full sweep.
//!
//! Invariant: a lock record exists iff exactly one index entry referencing
//! it exists under its owner's prefix.
//!
//! These operations deliberately do not re-check what their caller has
//! already verified: [`acquire`] assumes the key was confirmed free and
//! [`release`] assumes ownership was confirmed, both within the same atomic
//! invocation, so no other writer can interleave between check and act.

mod keys;
mod operations;
mod types;


pub use keys::{lock_id, split_lock_id};
pub use operations::{acquire, all_held_by, exists, owner_of, release};
pub use types::HeldLock;
