// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! HTTP client talking to the remote relational store (spec.md §4.6).

mod client;
mod error;

pub use client::RemoteClient;
pub use error::{UpsertError, UpsertResult};
