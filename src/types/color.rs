//! Hue, saturation and brightness color representation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::Error;

/// A static color as understood by Elgato lights.
///
/// - Hue: the color angle on the color wheel, `0.0..360.0` degrees
/// - Saturation: the intensity of the color, `0.0..=100.0` percent
/// - Brightness: the light output, `0.0..=100.0` percent
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Color {
    pub(crate) hue: f32,
    pub(crate) saturation: f32,
    pub(crate) brightness: f32,
}

impl Color {
    /// Create a new color with the given values.
    ///
    /// Returns `None` if values are outside valid ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_lights_rs::Color;
    ///
    /// assert!(Color::create(0.0, 100.0, 100.0).is_some());
    /// assert!(Color::create(359.9, 0.0, 0.0).is_some());
    /// assert!(Color::create(360.0, 50.0, 50.0).is_none());
    /// assert!(Color::create(180.0, 101.0, 50.0).is_none());
    /// assert!(Color::create(180.0, 50.0, -1.0).is_none());
    /// ```
    pub fn create(hue: f32, saturation: f32, brightness: f32) -> Option<Self> {
        let valid = (0.0..360.0).contains(&hue)
            && (0.0..=100.0).contains(&saturation)
            && (0.0..=100.0).contains(&brightness);
        valid.then_some(Color {
            hue,
            saturation,
            brightness,
        })
    }

    /// Fully desaturated color at the given brightness, clamped to
    /// `0.0..=100.0`. NaN gives [`Color::off`].
    ///
    /// ```
    /// use elgato_lights_rs::Color;
    ///
    /// assert_eq!(Color::white(250.0).brightness(), 100.0);
    /// assert_eq!(Color::white(f32::NAN), Color::off());
    /// ```
    pub fn white(brightness: f32) -> Self {
        if brightness.is_nan() {
            return Color::off();
        }
        Color {
            hue: 0.0,
            saturation: 0.0,
            brightness: brightness.clamp(0.0, 100.0),
        }
    }

    /// Black; the color used to switch a light off.
    pub fn off() -> Self {
        Self::default()
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse from comma-separated string (e.g., "240,100,80").
    fn from_str(s: &str) -> Result<Self, Error> {
        let parts = s
            .split(',')
            .map(|c| c.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::invalid_step(format!("{s:?}: {e}")))?;
        match parts.as_slice() {
            [h, sat, b] => Color::create(*h, *sat, *b)
                .ok_or_else(|| Error::invalid_step(format!("{s:?}: color out of range"))),
            _ => Err(Error::invalid_step(format!(
                "{s:?}: expected hue,saturation,brightness"
            ))),
        }
    }
}
