//! Compute module - the game simulation and its training loop.

mod bird;
mod ground;
mod mask;
mod pipe;
mod policy;
mod render;
mod session;

pub mod evolution;

pub use bird::*;
pub use ground::*;
pub use mask::*;
pub use pipe::*;
pub use policy::*;
pub use render::*;
pub use session::*;
