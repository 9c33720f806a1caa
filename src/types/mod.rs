//! Value types for light control parameters.

mod color;
mod power;
mod scene;

pub use color::Color;
pub use power::Power;
pub use scene::{Scene, SceneStep};
