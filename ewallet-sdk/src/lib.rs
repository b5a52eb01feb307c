//! Shared types for the eWallet ledger API.
//!
//! The `objects` and `config` modules are always available. The HTTP call
//! abstraction and its `reqwest` executor live in `client`, gated behind the
//! `client` cargo feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod auth;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod objects;
