//! Authoritative process for the action-authority protocol.
//!
//! The server owns the only canonical copy of every entity's state. All
//! character actions arrive as requests, are judged against the shared
//! validator, and go back out as broadcast results. AI agents live here
//! too and route their attacks through the same validation path as
//! participant requests.

pub mod agents;
pub mod authority;
pub mod behavior;
pub mod client_manager;
pub mod nav;
pub mod network;
pub mod perception;
pub mod probe;
