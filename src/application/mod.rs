//! Ledger services: collaborator intake, the verification engine, the
//! settlement aggregator, the deposit lifecycle manager, and the
//! [`engine::LedgerEngine`] facade that dispatches journal actions to them.
//!
//! All mutation of the stores goes through these services; no other
//! component writes payment or deposit records directly.

pub mod deposits;
pub mod engine;
pub mod intake;
pub mod settlement;
pub mod verification;
