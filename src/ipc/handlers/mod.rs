pub mod bulletin;
pub mod comments;
mod context;
pub mod core;
pub mod grading;
pub mod setup;
