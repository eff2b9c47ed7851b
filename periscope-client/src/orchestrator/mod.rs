mod callbacks;
mod orchestrator;

pub use callbacks::*;
pub use orchestrator::*;
