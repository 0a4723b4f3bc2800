pub mod components;
pub mod node;
pub mod picking;
pub mod pool;
pub mod prefabs;
pub mod world;

pub use node::*;
pub use world::*;
