//! Outbound notification port.

use crate::domain::error::StrongscanError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The channel is not configured; nothing was sent.
    Skipped,
}

pub trait NotifyPort {
    fn send_text(&self, message: &str) -> Result<Delivery, StrongscanError>;
    fn send_photo(&self, image_path: &Path) -> Result<Delivery, StrongscanError>;
}
