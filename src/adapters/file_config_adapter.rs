//! INI file configuration adapter.

use crate::domain::error::StrongscanError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

/// Settings read from an INI document. Section and key names are matched
/// case-insensitively; values are trimmed.
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut ini = Ini::new();
        ini.load(path).map_err(std::io::Error::other)?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(content.to_string())?;
        Ok(Self { ini })
    }

    /// Non-blank raw value of `key`.
    fn raw(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T: FromStr>(
        &self,
        section: &str,
        key: &str,
        default: T,
        kind: &str,
    ) -> Result<T, StrongscanError> {
        match self.raw(section, key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| StrongscanError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("'{value}' is not {kind}"),
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, StrongscanError> {
        self.parse_or(section, key, default, "an integer")
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, StrongscanError> {
        self.parse_or(section, key, default, "a number")
    }

    fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.raw(section, key).map(|raw| {
            raw.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
    }
}
