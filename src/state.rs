//! Light state tracking.

use std::net::SocketAddrV4;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{Color, Power, Scene};

type Result<T> = std::result::Result<T, Error>;

/// Brightness Elgato applies to a scene as a whole.
const SCENE_BRIGHTNESS: f32 = 100.0;

/// A scene currently playing on a light.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActiveScene {
    id: String,
    name: String,
    brightness: f32,
    scene: Scene,
}

impl ActiveScene {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// The looping steps; empty for a name-only placeholder.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

/// What a light is displaying. A light is in exactly one mode at a time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LightMode {
    Color(Color),
    Scene(ActiveScene),
}

/// The last known state of a light.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LightState {
    power: Power,
    mode: LightMode,
}

impl LightState {
    pub fn color(power: Power, color: Color) -> Self {
        LightState {
            power,
            mode: LightMode::Color(color),
        }
    }

    pub fn scene(scene: &Scene, name: &str, id: &str) -> Self {
        LightState {
            power: Power::On,
            mode: LightMode::Scene(ActiveScene {
                id: id.to_string(),
                name: name.to_string(),
                brightness: SCENE_BRIGHTNESS,
                scene: scene.clone(),
            }),
        }
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn mode(&self) -> &LightMode {
        &self.mode
    }

    /// The static color, or `None` while a scene is active.
    ///
    /// ```
    /// use elgato_lights_rs::{Color, LightState, Power, Scene};
    ///
    /// let state = LightState::color(Power::On, Color::white(40.0));
    /// assert_eq!(state.static_color().unwrap().brightness(), 40.0);
    ///
    /// let state = LightState::scene(&Scene::new(), "rainbow", "rainbow-id");
    /// assert!(state.static_color().is_none());
    /// ```
    pub fn static_color(&self) -> Option<Color> {
        match &self.mode {
            LightMode::Color(color) => Some(*color),
            LightMode::Scene(_) => None,
        }
    }

    pub fn active_scene(&self) -> Option<&ActiveScene> {
        match &self.mode {
            LightMode::Scene(scene) => Some(scene),
            LightMode::Color(_) => None,
        }
    }

    pub(crate) fn from_document(address: SocketAddrV4, doc: LightsDocument) -> Result<Self> {
        let Some(light) = doc.lights.into_iter().next() else {
            return Err(Error::malformed(address, "no light entries in document"));
        };

        if light.scene.is_some() || light.name.is_some() {
            return Ok(LightState {
                power: light.on,
                mode: LightMode::Scene(ActiveScene {
                    id: light.id.unwrap_or_default(),
                    name: light.name.unwrap_or_default(),
                    brightness: light.brightness.unwrap_or(SCENE_BRIGHTNESS),
                    scene: light.scene.unwrap_or_default(),
                }),
            });
        }

        let Some(brightness) = light.brightness else {
            return Err(Error::malformed(address, "static light without brightness"));
        };
        // Lights without a color wheel report no hue and are treated as white.
        let hue = light.hue.unwrap_or(0.0).rem_euclid(360.0);
        let saturation = light.saturation.unwrap_or(0.0);
        let color = Color::create(hue, saturation, brightness).ok_or_else(|| {
            Error::malformed(
                address,
                format!("color out of range: {hue},{saturation},{brightness}"),
            )
        })?;

        Ok(LightState::color(light.on, color))
    }
}

/// The `/elgato/lights` document, as read from and written to a light.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LightsDocument {
    pub number_of_lights: usize,
    pub lights: Vec<LightEntry>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LightEntry {
    pub on: Power,
    pub brightness: Option<f32>,
    pub hue: Option<f32>,
    pub saturation: Option<f32>,
    pub temperature: Option<u16>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub number_of_scene_elements: Option<usize>,
    pub scene: Option<Scene>,
}

impl LightsDocument {
    fn single(light: LightEntry) -> Self {
        LightsDocument {
            number_of_lights: 1,
            lights: vec![light],
        }
    }

    /// Static color document. Lights without a color wheel only get
    /// brightness.
    pub fn color(power: Power, color: &Color, with_hue: bool) -> Self {
        Self::single(LightEntry {
            on: power,
            brightness: Some(color.brightness()),
            hue: with_hue.then_some(color.hue()),
            saturation: with_hue.then_some(color.saturation()),
            ..Default::default()
        })
    }

    /// Scene document. An empty scene produces a name-only placeholder with
    /// no step data, so the light does not keep playing its old loop.
    pub fn scene(scene: &Scene, name: &str, id: &str) -> Self {
        let steps = (!scene.is_empty()).then(|| scene.clone());
        Self::single(LightEntry {
            on: Power::On,
            brightness: Some(SCENE_BRIGHTNESS),
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            number_of_scene_elements: steps.as_ref().map(Scene::len),
            scene: steps,
            ..Default::default()
        })
    }
}
