//! Health and quota store implementations

pub mod memory;
pub mod redis;
