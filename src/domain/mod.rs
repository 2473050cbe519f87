//! Leaf domain types: identifiers, money, the two ledger records with
//! their state machines, derived settlement batches, and the store ports.

pub mod deposit;
pub mod ids;
pub mod money;
pub mod payment;
pub mod ports;
pub mod settlement;
