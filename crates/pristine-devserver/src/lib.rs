//! Development file server for the chat widget.
//!
//! Serves a demo directory plus the sibling `frontend` directory so the
//! widget can be embedded in local test pages. Split from main.rs for
//! integration testing.

pub mod config;
pub mod logging;
pub mod routes;
