// Display side — reusable destination buffers and surface locking.

pub mod surface;
pub mod target;
