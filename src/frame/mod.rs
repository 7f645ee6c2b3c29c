// Frame domain — captured image model and pipeline errors.

pub mod error;
pub mod types;
