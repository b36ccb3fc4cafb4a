use crate::domain::models::{CharacteristicMap, DeviceDescriptor};
use crate::infrastructure::transport::protocol;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "flashcard_provision".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Device Contract Settings
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_ssid_uuid")]
    pub ble_ssid_char_uuid: String,
    #[serde(default = "default_password_uuid")]
    pub ble_password_char_uuid: String,
    #[serde(default = "default_token_uuid")]
    pub ble_token_char_uuid: String,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            ble_service_uuid: default_service_uuid(),
            ble_ssid_char_uuid: default_ssid_uuid(),
            ble_password_char_uuid: default_password_uuid(),
            ble_token_char_uuid: default_token_uuid(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    protocol::DEVICE_NAME.to_string()
}
fn default_service_uuid() -> String {
    protocol::SERVICE_UUID.to_string()
}
fn default_ssid_uuid() -> String {
    protocol::SSID_CHAR_UUID.to_string()
}
fn default_password_uuid() -> String {
    protocol::PASSWORD_CHAR_UUID.to_string()
}
fn default_token_uuid() -> String {
    protocol::TOKEN_CHAR_UUID.to_string()
}

impl Settings {
    /// The device to look for, with the service UUID parsed.
    pub fn descriptor(&self) -> anyhow::Result<DeviceDescriptor> {
        Ok(DeviceDescriptor {
            name: self.device_name.clone(),
            service_uuid: parse_uuid("ble_service_uuid", &self.ble_service_uuid)?,
        })
    }

    /// The configuration characteristics, parsed and ready for a session.
    pub fn characteristic_map(&self) -> anyhow::Result<CharacteristicMap> {
        Ok(CharacteristicMap {
            ssid: parse_uuid("ble_ssid_char_uuid", &self.ble_ssid_char_uuid)?,
            password: parse_uuid("ble_password_char_uuid", &self.ble_password_char_uuid)?,
            auth_token: parse_uuid("ble_token_char_uuid", &self.ble_token_char_uuid)?,
        })
    }
}

fn parse_uuid(field: &str, value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("invalid UUID in {field}: {value}"))
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("SmartFlashcard");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
