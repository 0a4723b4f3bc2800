//! Interactive wireframe globe: scene lifecycle, orbit controls, the
//! auto-rotate/drag state machine and marker click dispatch.
//!
//! A [`GlobeScene`] owns everything for one mounted view. Hosts feed it
//! pointer input and animation-frame timestamps through a [`Viewport`] and
//! receive draw commands and [`GlobeEvent`]s back.

pub mod config;
pub mod controls;
pub mod interaction;
pub mod lifecycle;
pub mod viewport;

pub use config::*;
pub use controls::*;
pub use interaction::*;
pub use lifecycle::*;
pub use viewport::*;

pub use layers::Marker;
