//! Small pure utilities shared across the engine.

pub mod addr;
pub mod ifname;
