//! Shared types for the Pristine chat widget.

mod api;
mod config;
mod message;
mod visitor;

pub use api::*;
pub use config::*;
pub use message::*;
pub use visitor::*;
