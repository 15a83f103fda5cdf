//! # Observer Library
//!
//! Client-side implementation for the action-authority protocol. The
//! observer holds no authority: it sends sequenced action requests and
//! movement intents, applies its own actions optimistically through the
//! shared validator, and lets every authoritative packet overwrite what
//! it predicted.
//!
//! ## Module Organization
//!
//! - `game`: the observer world model. Confirmed state written only by
//!   the authority, a predicted copy of the local entity, and the
//!   status read-out.
//! - `input`: line-based command parsing and the per-session sequencer
//!   that stamps outgoing requests.
//! - `network`: UDP connection handling, packet dispatch, and the
//!   select loop joining the socket, stdin, and the prediction tick.

pub mod game;
pub mod input;
pub mod network;
