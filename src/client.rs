//! REST transport for signed and public requests.
//!
//! - [`FuturesClient`] - rate-limited HTTP client for the futures API
//! - [`form_pairs`] / [`query_pairs`] / [`without_nulls`] - wire encoding of parameter sets

mod encode;
mod futures;

pub use encode::{form_pairs, query_pairs, without_nulls};
pub use futures::{FuturesClient, FuturesConfig};
