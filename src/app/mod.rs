//! Application layer: ports, events, and the node composition root.
//!
//! The domain logic lives in [`crate::match_engine`] and [`crate::puzzle`];
//! this layer defines the **port traits** everything is tested against,
//! the structured [`events`] the core emits, and the [`node::Node`] that
//! wires a puzzle to its coordination link. Nothing here touches real
//! hardware or a real broker.

pub mod events;
pub mod node;
pub mod ports;
