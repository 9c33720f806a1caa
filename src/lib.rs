//! # elgato_lights_rs
//!
//! An async Rust library for controlling Elgato lights over their HTTP API and
//! coordinating timed transitions across many of them.
//!
//! Lights are reached at `http://{ip}:9123/elgato/`. Each one can show a
//! static color or, for light strips, play a looping scene. On top of single
//! lights the crate offers a transition scheduler that starts a scene on a
//! batch of lights and switches every light to an end state once its scene
//! has played through, without waiting on any one light.
//!
//! ## Quick Start
//!
//! ```ignore
//! use elgato_lights_rs::{Color, Config, Light, Room, SceneStep, TransitionRequest, EndState};
//!
//! async fn fade_out() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = config.http.client()?;
//!     let light = Light::connect("192.168.1.100:9123".parse()?, Some("Desk"), client).await?;
//!
//!     let mut room = Room::new("Office");
//!     room.new_light(Box::new(light))?;
//!
//!     // Brighten for a second, then switch off.
//!     let request = TransitionRequest::from_steps(vec!["0,0,100,1000,0".parse()?])?
//!         .with_end(EndState::color(Color::off()));
//!     let report = room.apply_transition(&request).await?;
//!     assert!(report.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Colors**: hue/saturation/brightness using [`Color`]
//! - **Scenes**: looping multi-step scenes with [`Scene`] and [`SceneStep`]
//! - **Transitions**: timed start scene plus end state with [`TransitionScheduler`]
//! - **Room Grouping**: organize lights into [`Room`]s for batch operations
//! - **Discovery**: one-shot or rolling admission through the [`Discovery`] trait
//! - **Diagnostics**: per-light request/response [`MessageHistory`]
//!
//! ## Runtime
//!
//! The crate runs on tokio. Timers and the clock go through the [`runtime`]
//! module, so tests with paused time run transitions instantly.

mod config;
mod device;
mod discovery;
mod errors;
mod history;
mod http;
mod light;
#[cfg(test)]
mod mock;
mod room;
pub mod runtime;
mod scheduler;
mod state;
mod types;

// Re-export public API
pub use config::{
    AccessoryInfo, Config, DEFAULT_PORT, DEFAULT_SERVICE_TYPE, DiscoveryConfig, HttpConfig,
    LightSettings, ProductKind, TransitionConfig,
};
pub use device::Device;
pub use discovery::{DeviceMap, Discovery, DiscoverySender, DiscoverySession, ManualDiscovery};
pub use errors::Error;
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use light::Light;
pub use room::Room;
pub use scheduler::{
    DeviceReport, EndState, LogObserver, Outcome, TransitionObserver, TransitionReport,
    TransitionRequest, TransitionScheduler,
};
pub use state::{ActiveScene, LightMode, LightState};
pub use types::{Color, Power, Scene, SceneStep};
