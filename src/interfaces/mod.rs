//! Boundary adapters between the ledger and the outside world.

pub mod csv;
