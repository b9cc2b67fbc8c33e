//! Escape-room puzzle node library.
//!
//! One node watches physical inputs (contacts, a tag reader), decides when
//! its puzzle is solved, drives indicator outputs, and answers to a room
//! controller over a pub/sub bus. The layering is hexagonal:
//!
//! - [`match_engine`]: pure completion logic, three strategies
//! - [`puzzle`]: lifecycle state machine around one engine
//! - [`link`]: broker session, liveness pings, command dispatch
//! - [`app`]: port traits, node events, the composition root
//! - [`adapters`]: bench hardware, clocks, host probe, in-process bus
//!
//! Everything above `adapters` is deterministic and poll-driven; tests run
//! the whole node against a fake clock without a single sleep.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod match_engine;
pub mod puzzle;
