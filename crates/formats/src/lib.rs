pub mod boundary;
pub mod source;

pub use boundary::*;
pub use source::*;
