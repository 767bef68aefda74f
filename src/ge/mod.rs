//! Hardware compositing engine contract and its software implementation.

pub(crate) mod blend;
pub(crate) mod engine;
pub(crate) mod op;
pub(crate) mod soft;
