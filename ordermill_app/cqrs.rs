mod event;
mod handler;
mod outcome;

pub mod commands;
pub mod decorators;
pub mod queries;

pub use event::*;
pub use handler::*;
pub use outcome::*;
