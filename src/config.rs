//! Light identification and crate configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{DurationMilliSeconds, serde_as};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::errors::Error;

/// Port Elgato lights serve their REST API on.
pub const DEFAULT_PORT: u16 = 9123;

/// Service type Elgato lights announce over multicast DNS.
pub const DEFAULT_SERVICE_TYPE: &str = "_elg._tcp.local.";

/// Accessory information served on `/elgato/accessory-info`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryInfo {
    pub product_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub firmware_build_number: Option<u32>,
    #[serde(default)]
    pub hardware_board_type: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessoryInfo {
    pub fn kind(&self) -> ProductKind {
        ProductKind::detect(&self.product_name)
    }
}

/// Settings served on `/elgato/lights/settings`.
///
/// Unknown fields are kept so the document can be written back unchanged.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LightSettings {
    pub power_on_behavior: Option<u8>,
    pub power_on_brightness: Option<u8>,
    pub power_on_temperature: Option<u16>,
    pub switch_on_duration_ms: Option<u32>,
    pub switch_off_duration_ms: Option<u32>,
    pub color_change_duration_ms: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Classification of Elgato products by what they can display.
///
/// The `Display` form is the marker searched for in the product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize)]
pub enum ProductKind {
    /// Addressable color strip; plays scenes.
    #[strum(serialize = "Strip")]
    LightStrip,
    /// White panel light; brightness only.
    #[strum(serialize = "Key")]
    KeyLight,
    /// Anything else; driven as a static color light.
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl ProductKind {
    /// Detect the kind from a product name (e.g., "Elgato Light Strip").
    ///
    /// ```
    /// use elgato_lights_rs::ProductKind;
    ///
    /// assert_eq!(ProductKind::detect("Elgato Light Strip"), ProductKind::LightStrip);
    /// assert_eq!(ProductKind::detect("Elgato Key Light Air"), ProductKind::KeyLight);
    /// assert_eq!(ProductKind::detect("Elgato Ring Light"), ProductKind::Unknown);
    /// ```
    pub fn detect(product_name: &str) -> Self {
        ProductKind::iter()
            .filter(|kind| *kind != ProductKind::Unknown)
            .find(|kind| product_name.contains(&kind.to_string()))
            .unwrap_or(ProductKind::Unknown)
    }

    pub fn supports_scenes(&self) -> bool {
        matches!(self, ProductKind::LightStrip)
    }

    pub fn supports_hue(&self) -> bool {
        !matches!(self, ProductKind::KeyLight)
    }
}

/// Top-level configuration.
///
/// Every section falls back to its defaults, so a partial document is fine.
///
/// ```
/// use std::time::Duration;
/// use elgato_lights_rs::Config;
///
/// let config = Config::from_json(r#"{"transition": {"poll_interval_ms": 10}}"#).unwrap();
/// assert_eq!(config.transition.poll_interval, Duration::from_millis(10));
/// assert_eq!(config.discovery.service_type, "_elg._tcp.local.");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub transition: TransitionConfig,
    pub discovery: DiscoveryConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Per-request limits for talking to a light.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "timeout_ms")]
    pub timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl HttpConfig {
    /// Build the HTTP client shared by every light.
    pub fn client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(Error::HttpClient)
    }
}

/// Scheduling of timed transitions.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TransitionConfig {
    /// Longest the scheduler sleeps before re-checking its deadlines.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "poll_interval_ms")]
    pub poll_interval: Duration,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig {
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Discovery behaviour for rooms.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub service_type: String,
    /// Scan length for one-shot discovery, including rediscovery after a
    /// failed transition.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "timeout_ms")]
    pub timeout: Duration,
    /// Pause between passes of a rolling admission session.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "rescan_interval_ms")]
    pub rescan_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            timeout: Duration::from_secs(15),
            rescan_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessory_info() {
        let info: AccessoryInfo = serde_json::from_value(json!({
            "productName": "Elgato Light Strip",
            "hardwareBoardType": 70,
            "firmwareBuildNumber": 211,
            "firmwareVersion": "1.0.4",
            "serialNumber": "EW52J1A00082",
            "displayName": "Desk",
            "features": ["lights"],
            "wifi-info": {"ssid": "home"}
        }))
        .unwrap();

        assert_eq!(info.kind(), ProductKind::LightStrip);
        assert_eq!(info.display_name.as_deref(), Some("Desk"));
        assert!(info.extra.contains_key("wifi-info"));
    }

    #[test]
    fn test_settings_keep_unknown_fields() {
        let raw = json!({
            "powerOnBehavior": 1,
            "powerOnBrightness": 20,
            "switchOnDurationMs": 100,
            "battery": {"level": 80}
        });
        let settings: LightSettings = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(settings.power_on_brightness, Some(20));
        assert_eq!(serde_json::to_value(&settings).unwrap(), raw);
    }

    #[test]
    fn test_capabilities() {
        assert!(ProductKind::LightStrip.supports_scenes());
        assert!(!ProductKind::KeyLight.supports_scenes());
        assert!(!ProductKind::KeyLight.supports_hue());
        assert!(ProductKind::Unknown.supports_hue());
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.http.timeout, Duration::from_secs(3));
        assert_eq!(config.transition.poll_interval, Duration::from_millis(50));
        assert_eq!(config.discovery.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_config_durations_in_millis() {
        let config = Config::from_json(
            r#"{"http": {"timeout_ms": 750}, "discovery": {"service_type": "_x._tcp.local.", "timeout_ms": 2000}}"#,
        )
        .unwrap();
        assert_eq!(config.http.timeout, Duration::from_millis(750));
        assert_eq!(config.http.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.discovery.service_type, "_x._tcp.local.");
        assert_eq!(config.discovery.rescan_interval, Duration::from_secs(5));
    }
}
