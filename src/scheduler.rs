//! Timed scene transitions across many lights.
//!
//! A transition plays a start scene on every target light, then, once each
//! light's start scene reaches its final step, replaces it with an end state.
//! One task drives the whole batch: start commands go out in order, the
//! deadlines go into a min-heap, and the scheduler sleeps until the earliest
//! one (never longer than the configured poll interval) before finishing
//! whichever lights are due. A light that fails at any point is recorded and
//! skipped over; it never holds up the others.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::config::TransitionConfig;
use crate::device::Device;
use crate::errors::Error;
use crate::runtime::{self, Instant};
use crate::types::{Color, Power, Scene, SceneStep};

type Result<T> = std::result::Result<T, Error>;

/// What a light shows once its start scene has played out.
#[derive(Debug, Clone, PartialEq)]
pub enum EndState {
    /// Relabel the light and stop its loop, leaving a name-only placeholder.
    Named { name: String, id: String },
    /// Leave scene mode for a static color.
    Color { power: Power, color: Color },
    /// Replace the loop with a new scene.
    Scene { scene: Scene, name: String, id: String },
}

impl Default for EndState {
    fn default() -> Self {
        EndState::named(EndState::DEFAULT_NAME, EndState::DEFAULT_ID)
    }
}

impl EndState {
    pub const DEFAULT_NAME: &'static str = "end-scene";
    pub const DEFAULT_ID: &'static str = "end-scene-id";

    pub fn named(name: &str, id: &str) -> Self {
        EndState::Named {
            name: name.to_string(),
            id: id.to_string(),
        }
    }

    /// Static color; the light is switched off when brightness is zero.
    pub fn color(color: Color) -> Self {
        EndState::Color {
            power: Power::from_brightness(color.brightness()),
            color,
        }
    }

    /// Build an end state from raw steps: none relabels, one becomes a static
    /// color (durations ignored), more become a scene.
    ///
    /// ```
    /// use elgato_lights_rs::{Color, EndState, Power, SceneStep};
    ///
    /// let off = SceneStep::new(Color::off(), 0, 0);
    /// match EndState::from_steps(vec![off], "end", "end-id") {
    ///     EndState::Color { power, .. } => assert_eq!(power, Power::Off),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// assert!(EndState::from_steps(vec![], "end", "end-id").is_named());
    /// ```
    pub fn from_steps(steps: Vec<SceneStep>, name: &str, id: &str) -> Self {
        match steps.len() {
            0 => EndState::named(name, id),
            1 => EndState::color(steps[0].color()),
            _ => EndState::Scene {
                scene: Scene::from_steps(steps),
                name: name.to_string(),
                id: id.to_string(),
            },
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, EndState::Named { .. })
    }

    /// Issue the end command to one device.
    pub async fn apply(&self, device: &mut dyn Device) -> Result<()> {
        let placeholder = Scene::new();
        match self {
            EndState::Named { name, id } => device.set_scene(&placeholder, name, id).await,
            EndState::Color { power, color } => device.set_color(*power, *color).await,
            EndState::Scene { scene, name, id } => device.set_scene(scene, name, id).await,
        }
    }
}

/// A start scene to play and the end state to settle on.
///
/// ```
/// use elgato_lights_rs::{Color, Scene, SceneStep, TransitionRequest};
///
/// assert!(TransitionRequest::new(Scene::new()).is_err());
///
/// let scene = Scene::from_steps(vec![SceneStep::new(Color::white(100.0), 1000, 0)]);
/// let request = TransitionRequest::new(scene).unwrap();
/// assert_eq!(request.name(), "transition-scene");
/// assert!(request.end().is_named());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    start: Scene,
    name: String,
    id: String,
    end: EndState,
}

impl TransitionRequest {
    pub const DEFAULT_NAME: &'static str = "transition-scene";
    pub const DEFAULT_ID: &'static str = "transition-scene-id";

    /// Fails with [`Error::InvalidRequest`] if `start` is empty.
    pub fn new(start: Scene) -> Result<Self> {
        if start.is_empty() {
            return Err(Error::invalid_request("cannot transition to an empty scene"));
        }
        Ok(TransitionRequest {
            start,
            name: Self::DEFAULT_NAME.to_string(),
            id: Self::DEFAULT_ID.to_string(),
            end: EndState::default(),
        })
    }

    pub fn from_steps(steps: Vec<SceneStep>) -> Result<Self> {
        Self::new(Scene::from_steps(steps))
    }

    /// Label the start scene.
    pub fn with_name(mut self, name: &str, id: &str) -> Self {
        self.name = name.to_string();
        self.id = id.to_string();
        self
    }

    pub fn with_end(mut self, end: EndState) -> Self {
        self.end = end;
        self
    }

    pub fn start(&self) -> &Scene {
        &self.start
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn end(&self) -> &EndState {
        &self.end
    }

    /// Hold on the final start step as a static color when no end state
    /// was chosen.
    pub(crate) fn hold_final_step(mut self) -> Self {
        if self.end.is_named()
            && let Some(last) = self.start.last()
        {
            self.end = EndState::color(last.color());
        }
        self
    }
}

/// How one light fared in a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    StartFailed,
    EndFailed,
}

/// Per-light result of a transition.
#[derive(Debug)]
pub struct DeviceReport {
    address: SocketAddrV4,
    start_error: Option<Error>,
    end_error: Option<Error>,
}

impl DeviceReport {
    pub fn address(&self) -> SocketAddrV4 {
        self.address
    }

    pub fn start_error(&self) -> Option<&Error> {
        self.start_error.as_ref()
    }

    pub fn end_error(&self) -> Option<&Error> {
        self.end_error.as_ref()
    }

    /// A failed start takes precedence over a failed end.
    pub fn outcome(&self) -> Outcome {
        match (&self.start_error, &self.end_error) {
            (Some(_), _) => Outcome::StartFailed,
            (None, Some(_)) => Outcome::EndFailed,
            (None, None) => Outcome::Success,
        }
    }
}

/// Result of a whole transition, one entry per target light in target order.
#[derive(Debug, Default)]
pub struct TransitionReport {
    devices: Vec<DeviceReport>,
}

impl TransitionReport {
    pub fn devices(&self) -> &[DeviceReport] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// True iff at least one light's start or end command failed.
    pub fn any_failed(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn is_success(&self) -> bool {
        !self.any_failed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeviceReport> {
        self.devices
            .iter()
            .filter(|report| report.outcome() != Outcome::Success)
    }

    /// Outcome for the first light at `address`.
    pub fn outcome_of(&self, address: SocketAddrV4) -> Option<Outcome> {
        self.devices
            .iter()
            .find(|report| report.address == address)
            .map(DeviceReport::outcome)
    }
}

/// Receives progress events from a running transition.
pub trait TransitionObserver: Send + Sync {
    /// The start command went out; the light is due after `hold`.
    fn started(&self, _address: SocketAddrV4, _hold: Duration, _result: &Result<()>) {}

    /// Nothing is due yet; the next light is due in `next_due`.
    fn waiting(&self, _pending: usize, _next_due: Duration) {}

    /// The end command went out.
    fn finished(&self, _address: SocketAddrV4, _result: &Result<()>) {}
}

/// Reports transition progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransitionObserver for LogObserver {
    fn started(&self, address: SocketAddrV4, hold: Duration, result: &Result<()>) {
        match result {
            Ok(()) => debug!("{address}: transition started, due in {hold:?}"),
            Err(e) => warn!("{address}: transition start failed: {e}"),
        }
    }

    fn waiting(&self, pending: usize, next_due: Duration) {
        trace!("{pending} light(s) pending, next due in {next_due:?}");
    }

    fn finished(&self, address: SocketAddrV4, result: &Result<()>) {
        match result {
            Ok(()) => debug!("{address}: transition finished"),
            Err(e) => warn!("{address}: transition end failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    deadline: Instant,
    index: usize,
}

/// Drives lights through start scene, wait, end state.
///
/// Callers must not run overlapping transitions on the same light.
#[derive(Clone)]
pub struct TransitionScheduler {
    config: TransitionConfig,
    observer: Arc<dyn TransitionObserver>,
}

impl Default for TransitionScheduler {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

impl TransitionScheduler {
    pub fn new(config: TransitionConfig) -> Self {
        TransitionScheduler {
            config,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransitionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Run one transition over a fixed set of devices.
    ///
    /// Every device gets exactly one start command, in slice order, before
    /// any end command goes out. Each device then gets exactly one end
    /// command, no earlier than its own deadline. Device failures land in the
    /// report; only an invalid request is returned as an error.
    pub async fn run(
        &self,
        devices: &mut [&mut dyn Device],
        request: &TransitionRequest,
    ) -> Result<TransitionReport> {
        if request.start().is_empty() {
            return Err(Error::invalid_request("cannot transition to an empty scene"));
        }
        if devices.is_empty() {
            return Ok(TransitionReport::default());
        }

        let mut reports = Vec::with_capacity(devices.len());
        let mut pending = BinaryHeap::with_capacity(devices.len());

        for (index, device) in devices.iter_mut().enumerate() {
            let device: &mut dyn Device = &mut **device;
            let current = match device.read_state().await {
                Ok(state) => state.static_color(),
                Err(e) => {
                    debug!("{}: no current color to fade from: {}", device.address(), e);
                    None
                }
            };
            let scene = start_scene(current, request.start());
            let hold = scene.hold_offset();

            let issued = Instant::now();
            let result = device
                .set_scene(&scene, request.name(), request.id())
                .await;
            self.observer.started(device.address(), hold, &result);

            // Queued even on failure: the light may have applied the command.
            pending.push(Reverse(Pending {
                deadline: issued + hold,
                index,
            }));
            reports.push(DeviceReport {
                address: device.address(),
                start_error: result.err(),
                end_error: None,
            });
        }

        while let Some(Reverse(next)) = pending.peek().copied() {
            let now = Instant::now();
            if now < next.deadline {
                let due = next.deadline.saturating_duration_since(now);
                self.observer.waiting(pending.len(), due);
                runtime::sleep(due.min(self.config.poll_interval)).await;
                continue;
            }

            pending.pop();
            let device: &mut dyn Device = &mut *devices[next.index];
            let result = request.end().apply(device).await;
            self.observer.finished(device.address(), &result);
            reports[next.index].end_error = result.err();
        }

        let report = TransitionReport { devices: reports };
        info!(
            "transition {:?} finished on {} light(s), {} failed",
            request.name(),
            report.len(),
            report.failures().count()
        );
        Ok(report)
    }
}

/// The requested steps, preceded by the light's current static color so the
/// light fades from what it shows now.
fn start_scene(current: Option<Color>, steps: &Scene) -> Scene {
    let mut scene = steps.clone();
    if let (Some(color), Some(first)) = (current, steps.first()) {
        scene.insert(
            0,
            SceneStep::new(color, first.duration_ms(), first.transition_ms()),
        );
    }
    scene
}
