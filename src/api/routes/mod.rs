//! API route modules.

pub mod events;
pub mod recording;
pub mod sdk;
