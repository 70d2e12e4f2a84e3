//! Reusable components built on the public kernel API.

pub mod block_mem;
pub mod clock;

pub use block_mem::{BlockMemConfig, BlockMemHandle, DualPortBlockMemory, MemoryPortPins, MAX_ADDR_WIDTH};
pub use clock::Clock;
