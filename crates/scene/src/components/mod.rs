pub mod geometry;
pub mod kind;
pub mod material;
pub mod transform;

pub use geometry::*;
pub use kind::*;
pub use material::*;
pub use transform::*;
