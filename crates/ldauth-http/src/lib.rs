//! HTTP surface of the ldauth bridge
//!
//! Request translation, the auth endpoint, and the response-header
//! contract the front-end proxy consumes.

pub mod respond;
pub mod server;
pub mod translate;

pub use server::{AppState, AuthServer};
