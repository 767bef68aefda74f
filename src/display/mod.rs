//! Frame-buffer device contract, the software display and the dual-layer dispatcher.

pub(crate) mod device;
pub(crate) mod dispatch;
pub(crate) mod soft;
