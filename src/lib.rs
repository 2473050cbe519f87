//! Driver payment and settlement ledger.
//!
//! Tracks card-payment receipts collected by drivers, verifies them,
//! aggregates verified receipts into per-driver settlement batches, and
//! manages each driver's refundable security deposit. The surrounding
//! marketplace (order placement, bots, admin pages) talks to this crate
//! through the services in [`application`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
