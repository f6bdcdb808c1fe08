//! Identity reconciliation and academic aggregation for the campus
//! dashboard.
//!
//! Every entry point is a pure function over caller-supplied snapshots. The
//! `ipc` module wraps them in the newline-delimited JSON protocol spoken by
//! the `campusd` sidecar binary.

pub mod assignments;
pub mod calc;
pub mod cohort;
pub mod config;
pub mod error;
pub mod identity;
pub mod ipc;
pub mod model;
pub mod normalize;
pub mod sections;
