//! Port traits: the narrow boundary between the screening core and the
//! outside world.

pub mod artifact_port;
pub mod config_port;
pub mod history_port;
pub mod notify_port;
pub mod snapshot_port;
