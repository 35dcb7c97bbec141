//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data Model
//! - A tee reads fixed-size chunks from one [`ChunkReader`]
//! - Each chunk is duplicated to N outputs, each backed by one [`ChunkWriter`]
//! - Each output is described by an [`OutputConfig`] with its own backpressure [`Policy`]

mod blueprint;
mod error;
mod sink;
mod source;

pub use blueprint::*;
pub use error::*;
pub use sink::*;
pub use source::*;
