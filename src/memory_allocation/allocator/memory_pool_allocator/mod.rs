pub mod memory_pool;

pub use memory_pool::MemoryPool;
