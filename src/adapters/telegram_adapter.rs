//! Telegram Bot API notifier.
//!
//! Without both a bot token and a chat id the adapter is inert: every send
//! reports [`Delivery::Skipped`].

use crate::domain::error::StrongscanError;
use crate::ports::notify_port::{Delivery, NotifyPort};
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const TEXT_TIMEOUT: Duration = Duration::from_secs(15);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramSettings {
    fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.token.as_deref().filter(|t| !t.trim().is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.trim().is_empty())?;
        Some((token, chat_id))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

pub struct TelegramNotifier {
    client: Client,
    settings: TelegramSettings,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(settings: TelegramSettings) -> Result<Self, StrongscanError> {
        let client = Client::builder()
            .build()
            .map_err(|e| StrongscanError::Notify {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            settings,
            api_base: API_BASE.to_string(),
        })
    }

    fn api_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, token)
    }

    fn post(&self, method: &str, form: Form, timeout: Duration) -> Result<(), StrongscanError> {
        let Some((token, _)) = self.settings.credentials() else {
            return Ok(());
        };
        let response = self
            .client
            .post(self.api_url(token, method))
            .timeout(timeout)
            .multipart(form)
            .send()
            .map_err(|e| StrongscanError::Notify {
                reason: format!("{method}: {}", e.without_url()),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(StrongscanError::Notify {
                reason: format!("{method} failed with {status}: {body}"),
            });
        }
        Ok(())
    }
}

impl NotifyPort for TelegramNotifier {
    fn send_text(&self, message: &str) -> Result<Delivery, StrongscanError> {
        let Some((_, chat_id)) = self.settings.credentials() else {
            tracing::info!("telegram not configured; message not sent");
            return Ok(Delivery::Skipped);
        };
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("text", escape_html(message))
            .text("parse_mode", "HTML");
        self.post("sendMessage", form, TEXT_TIMEOUT)?;
        tracing::debug!("telegram message sent");
        Ok(Delivery::Sent)
    }

    fn send_photo(&self, image_path: &Path) -> Result<Delivery, StrongscanError> {
        let Some((_, chat_id)) = self.settings.credentials() else {
            tracing::info!(path = %image_path.display(), "telegram not configured; chart not sent");
            return Ok(Delivery::Skipped);
        };
        let bytes = std::fs::read(image_path).map_err(|e| StrongscanError::Notify {
            reason: format!("{}: {e}", image_path.display()),
        })?;
        let file_name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chart")
            .to_string();
        let (method, field) = upload_method(image_path);
        let caption = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| file_name.clone());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption)
            .part(field, Part::bytes(bytes).file_name(file_name));
        self.post(method, form, UPLOAD_TIMEOUT)?;
        tracing::debug!(path = %image_path.display(), "telegram chart sent");
        Ok(Delivery::Sent)
    }
}

/// Telegram renders only raster photos inline; anything else goes up as a
/// document.
pub fn upload_method(path: &Path) -> (&'static str, &'static str) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg") => ("sendPhoto", "photo"),
        _ => ("sendDocument", "document"),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
