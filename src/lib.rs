//! stagelock: a cross-contract lock and staged-transaction coordinator for a
//! permissioned ledger.
//!
//! Multi-stage business operations ("requests") span several resource
//! contracts. This crate keeps each request's locks and per-stage outputs in
//! one durable record, enforces mutual exclusion over resource keys through a
//! Lock Index, and drives the request state machine. Everything executes
//! inside a single atomic ledger invocation supplied by the embedding
//! process through the [`ledger::LedgerTransaction`] trait.
//!
//! The flow of one invocation:
//!
//! 1. [`dispatch::Coordinator::invoke`] routes a named operation,
//! 2. [`manager`] validates, authorizes, and applies the stage,
//! 3. [`locker`] runs the check-then-invoke-then-record protocol per
//!    resource contract, via the [`gateway`] and the [`lockindex`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lockindex;
pub mod locker;
pub mod manager;
pub mod model;

#[cfg(test)]
pub(crate) mod test_support;
