// Capture side — turns capture engine callbacks into frames.

pub mod bridge;
pub mod dummy;
pub mod native;
