//! sko-daemon library surface.
//!
//! `main.rs` wires these modules into the running HTTP server; tests
//! compose the router directly.

pub mod api_types;
pub mod routes;
pub mod state;
