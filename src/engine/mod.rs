//! Render loop, its device context and the thread-safe control surface.

pub(crate) mod context;
pub(crate) mod control;
pub(crate) mod render_loop;
