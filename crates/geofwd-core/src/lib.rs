//! # Geofwd Core
//!
//! Core types, geometry and scheduling capabilities for position-aware,
//! opportunistic forwarding in multi-hop wireless networks.
//!
//! Nothing in this crate reads ambient global state. The current position of
//! a node and the scheduler that drives its timers are passed in explicitly,
//! so every forwarding decision built on top of it can be exercised in
//! isolation.
//!
//! ## Key Types
//!
//! - [`NodeId`]: Identity of a node for the lifetime of a run
//! - [`FaceId`] / [`LinkType`]: Outgoing links as seen by the forwarder
//! - [`Position`] / [`Point2D`]: Reported coordinates
//! - [`Scheduler`]: Capability to run one-shot, cancellable callbacks
//! - [`EventQueue`]: Deterministic discrete-event [`Scheduler`]
//!
//! ## Geometry
//!
//! The [`geometry`] module holds the planar helpers used by the forwarding
//! strategies: Euclidean distance, triangle area, the area-based
//! point-in-quadrilateral test and corridor construction.

pub mod error;
pub mod geometry;
pub mod identity;
pub mod position;
pub mod scheduler;

// Re-export main types
pub use error::*;
pub use geometry::{
    build_corridor, distance, point_in_quad, point_in_quad_with_precision, round_to,
    triangle_area, Quad, DEFAULT_AREA_PRECISION,
};
pub use identity::*;
pub use position::*;
pub use scheduler::*;
