pub mod layer;
pub mod markers;
pub mod outline;

pub use layer::*;
pub use markers::*;
pub use outline::*;
