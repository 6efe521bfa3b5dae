// src/dag/mod.rs

//! Dependency graphs over milestones or tasks.
//!
//! - [`graph`] holds the edge set for one scope and guards it against cycles.
//! - [`satisfaction`] answers whether a node's predecessor constraints hold
//!   under the four dependency types and their lag.
//! - [`critical_path`] derives zero-slack nodes from planned durations.
//! - [`state_manager`] walks a graph to collect every blocked node at once.

pub mod critical_path;
pub mod graph;
pub mod satisfaction;
pub mod state_manager;

pub use critical_path::CriticalPath;
pub use graph::{DependencyGraph, GraphNode, GraphScope};
pub use satisfaction::Gate;
pub use state_manager::{BlockedNode, ReadinessView};
