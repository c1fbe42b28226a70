//! Signal execution gateway
//!
//! Receives trading signals over HTTP and turns them into entry, take-profit,
//! stop-loss and close orders on a perpetual-futures venue.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod rate_limit;
pub mod secrets;
