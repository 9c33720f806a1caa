//! Looping scenes played autonomously by a light.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Color;
use crate::errors::Error;

/// One element of a scene: a color held for `duration_ms`, reached by
/// fading over `transition_ms`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneStep {
    hue: f32,
    saturation: f32,
    brightness: f32,
    duration_ms: u64,
    transition_ms: u64,
}

impl SceneStep {
    pub fn new(color: Color, duration_ms: u64, transition_ms: u64) -> Self {
        SceneStep {
            hue: color.hue,
            saturation: color.saturation,
            brightness: color.brightness,
            duration_ms,
            transition_ms,
        }
    }

    pub fn color(&self) -> Color {
        Color {
            hue: self.hue,
            saturation: self.saturation,
            brightness: self.brightness,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn transition_ms(&self) -> u64 {
        self.transition_ms
    }

    /// Time spent on this step, fade included.
    pub fn length_ms(&self) -> u64 {
        self.duration_ms.saturating_add(self.transition_ms)
    }
}

impl FromStr for SceneStep {
    type Err = Error;

    /// Parse from comma-separated string `hue,saturation,brightness,duration_ms,transition_ms`
    /// (e.g., "240,100,80,1000,500").
    fn from_str(s: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [h, sat, b, d, t] = parts.as_slice() else {
            return Err(Error::invalid_step(format!(
                "{s:?}: expected h,s,b,duration_ms,transition_ms"
            )));
        };
        let color = Color::from_str(&format!("{h},{sat},{b}"))?;
        let duration = d
            .parse::<u64>()
            .map_err(|e| Error::invalid_step(format!("{s:?}: duration: {e}")))?;
        let transition = t
            .parse::<u64>()
            .map_err(|e| Error::invalid_step(format!("{s:?}: transition: {e}")))?;
        Ok(SceneStep::new(color, duration, transition))
    }
}

/// An ordered loop of [`SceneStep`]s.
///
/// An empty scene is valid and means "no active loop".
///
/// # Examples
///
/// ```
/// use elgato_lights_rs::{Color, Scene, SceneStep};
///
/// let mut scene = Scene::new();
/// scene.push(SceneStep::new(Color::white(100.0), 1000, 200));
/// scene.push(SceneStep::new(Color::off(), 500, 300));
/// assert_eq!(scene.total_duration_ms(), 2000);
/// assert_eq!(scene.hold_offset().as_millis(), 1200);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Scene {
    steps: Vec<SceneStep>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<SceneStep>) -> Self {
        Scene { steps }
    }

    /// Append a step to the end of the loop.
    pub fn push(&mut self, step: SceneStep) {
        self.steps.push(step);
    }

    /// Insert a step at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, step: SceneStep) {
        self.steps.insert(index, step);
    }

    /// Remove and return the step at `index`, or `None` if out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<SceneStep> {
        (index < self.steps.len()).then(|| self.steps.remove(index))
    }

    pub fn steps(&self) -> &[SceneStep] {
        &self.steps
    }

    pub fn first(&self) -> Option<&SceneStep> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&SceneStep> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of every step's duration and transition time.
    pub fn total_duration_ms(&self) -> u64 {
        self.steps
            .iter()
            .fold(0u64, |acc, step| acc.saturating_add(step.length_ms()))
    }

    /// Time until the loop reaches the start of its final step.
    ///
    /// The final step is the hold state, so it is not waited out.
    pub fn hold_offset(&self) -> Duration {
        let last = self.steps.last().map_or(0, SceneStep::length_ms);
        Duration::from_millis(self.total_duration_ms() - last)
    }
}

impl FromIterator<SceneStep> for Scene {
    fn from_iter<I: IntoIterator<Item = SceneStep>>(iter: I) -> Self {
        Scene {
            steps: iter.into_iter().collect(),
        }
    }
}
