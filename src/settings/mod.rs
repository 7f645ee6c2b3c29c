// Settings — pipeline tunables and their JSON persistence.

pub mod store;
pub mod types;
