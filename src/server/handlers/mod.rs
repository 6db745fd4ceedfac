//! Helper API HTTP handlers.

mod liveness;
mod websteps;

pub use liveness::liveness_handler;
pub use websteps::websteps_handler;
