//! The capability interface every controllable light implements.

use std::net::SocketAddrV4;

use crate::config::ProductKind;
use crate::errors::Error;
use crate::runtime::BoxFuture;
use crate::state::LightState;
use crate::types::{Color, Power, Scene};

type Result<T> = std::result::Result<T, Error>;

/// A network-attached light the scheduler and rooms can drive.
///
/// Operations are single attempts: a failure is reported to the caller and
/// never retried here. Each implementation owns only its own state, so
/// different devices can be driven independently.
pub trait Device: Send + Sync {
    fn address(&self) -> SocketAddrV4;

    fn name(&self) -> Option<&str>;

    fn kind(&self) -> ProductKind;

    /// Last known state, if it was ever read or written.
    fn state(&self) -> Option<&LightState>;

    /// Fetch the current power and color-or-scene state from the device.
    fn read_state(&mut self) -> BoxFuture<'_, Result<LightState>>;

    /// Replace the device state with a static color.
    fn set_color(&mut self, power: Power, color: Color) -> BoxFuture<'_, Result<()>>;

    /// Replace the device state with a looping scene. An empty scene leaves
    /// the device on a name-only placeholder.
    fn set_scene<'a>(
        &'a mut self,
        scene: &'a Scene,
        name: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<()>>;

    /// The static color last known to be shown; `None` in scene mode.
    fn current_color(&self) -> Option<Color> {
        self.state().and_then(LightState::static_color)
    }
}
