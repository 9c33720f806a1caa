//! Power state for light control.

use serde::{Deserialize, Serialize};

/// Power state for a light.
///
/// Elgato lights report and accept this as an integer `on` field (`0` or `1`).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "u8", into = "u8")]
pub enum Power {
    /// Turn the light on
    #[default]
    On,
    /// Turn the light off
    Off,
}

impl Power {
    /// Any positive brightness means the light is on; zero means off.
    ///
    /// ```
    /// use elgato_lights_rs::Power;
    ///
    /// assert_eq!(Power::from_brightness(0.5), Power::On);
    /// assert_eq!(Power::from_brightness(0.0), Power::Off);
    /// ```
    pub fn from_brightness(brightness: f32) -> Self {
        if brightness > 0.0 { Power::On } else { Power::Off }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Power::On)
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on { Power::On } else { Power::Off }
    }
}

impl From<u8> for Power {
    fn from(value: u8) -> Self {
        Power::from(value != 0)
    }
}

impl From<Power> for u8 {
    fn from(power: Power) -> Self {
        power.is_on() as u8
    }
}
