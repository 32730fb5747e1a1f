//! Provider descriptor data structures and helpers shared by all flows.
//!
//! The module exposes validated endpoint metadata so a linking provider can be described
//! in a transport-agnostic way. Which endpoints are declared decides which issuance
//! modes a broker supports.

/// Builder API for assembling provider descriptors.
pub mod descriptor;

pub use descriptor::*;
