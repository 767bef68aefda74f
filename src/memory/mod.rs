//! Physically contiguous device memory with an explicit cache-coherency discipline.

pub(crate) mod buffer;
pub(crate) mod pool;
