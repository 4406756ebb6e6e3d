//! Ports for the lane indices.

pub mod inbound;

pub use inbound::*;
