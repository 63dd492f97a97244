//! Marker traits separating writes from reads
//!
//! Every request type registered with the mediator implements exactly one
//! of these.

/// A request that changes state
pub trait Command: Send + 'static {}

/// A request that only reads state
pub trait Query: Send + 'static {}
