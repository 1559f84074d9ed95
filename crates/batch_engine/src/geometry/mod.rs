//! Geometry generators layered on the batches
//!
//! - **lines**: circles, box outlines and grids emitted as line segments
//!   into anything implementing [`LineSink`]
//! - **mesh**: planes, boxes and spheres emitted into triangle batches
//!   through [`TriangleShape`]
//!
//! Generators hold no state of their own; they only call the batches'
//! add operations.

mod lines;
mod mesh;

pub use lines::LineSink;
pub use mesh::{BoxShape, Plane, Sphere, TriangleShape};
