//! REST surface: the admission decision endpoint and the lifecycle API used
//! by the external reconciler

pub mod handlers;
pub mod router;
pub mod state;
