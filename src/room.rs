//! Room grouping for batch operations.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, DiscoveryConfig};
use crate::device::Device;
use crate::discovery::{DeviceMap, Discovery, DiscoverySession};
use crate::errors::Error;
use crate::scheduler::{TransitionReport, TransitionRequest, TransitionScheduler};
use crate::state::LightState;
use crate::types::{Color, Power};

type Result<T> = std::result::Result<T, Error>;

/// A group of lights driven together.
///
/// A room owns its lights. Members come from a [`Discovery`] source (one-shot
/// or rolling) or are registered by hand, one light per address. Room
/// commands never fail because of a single light: per-light errors are
/// returned alongside the others' results.
///
/// # Example
///
/// ```
/// use elgato_lights_rs::{Device, Light, Room};
///
/// let mut room = Room::new("Studio");
/// let light = Light::new("192.168.1.100:9123".parse().unwrap(), Some("Key"), reqwest::Client::new());
/// let light_id = room.new_light(Box::new(light)).unwrap();
///
/// assert_eq!(room.len(), 1);
/// assert_eq!(room.read(&light_id).unwrap().name(), Some("Key"));
/// ```
pub struct Room {
    name: String,
    lights: HashMap<Uuid, Box<dyn Device>>,
    discovery: Option<Arc<dyn Discovery>>,
    config: DiscoveryConfig,
    scheduler: TransitionScheduler,
    session: Option<DiscoverySession>,
}

impl Room {
    /// Create an empty room without a discovery source.
    pub fn new(name: &str) -> Self {
        Room {
            name: String::from(name),
            lights: HashMap::new(),
            discovery: None,
            config: DiscoveryConfig::default(),
            scheduler: TransitionScheduler::default(),
            session: None,
        }
    }

    /// Create an empty room whose members come from `discovery`.
    pub fn with_discovery(name: &str, discovery: Arc<dyn Discovery>, config: &Config) -> Self {
        Room {
            discovery: Some(discovery),
            config: config.discovery.clone(),
            scheduler: TransitionScheduler::new(config.transition.clone()),
            ..Room::new(name)
        }
    }

    /// Replace the scheduler, e.g. to attach a custom observer.
    pub fn with_scheduler(mut self, scheduler: TransitionScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Whether a rolling discovery session is feeding this room.
    pub fn is_rolling(&self) -> bool {
        self.session.as_ref().is_some_and(DiscoverySession::is_active)
    }

    /// Populate the room from its discovery source.
    ///
    /// With a timeout, scan once and replace the membership with what was
    /// found. Without one, start a rolling session whose lights join through
    /// [`Room::admit`]. Any previous session is cancelled either way.
    /// Returns whether the room knows at least one light afterwards.
    pub async fn setup(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let discovery = self
            .discovery
            .clone()
            .ok_or_else(|| Error::NoDiscovery(self.name.clone()))?;

        if let Some(mut session) = self.session.take() {
            session.cancel();
        }

        match timeout {
            Some(timeout) => {
                let found = discovery.discover(&self.config.service_type, timeout).await?;
                self.replace_members(found);
            }
            None => {
                let session = discovery
                    .start_continuous(&self.config.service_type)
                    .await?;
                self.lights.clear();
                self.session = Some(session);
                self.admit();
            }
        }

        info!("room {:?} set up with {} light(s)", self.name, self.lights.len());
        Ok(!self.lights.is_empty())
    }

    /// Take in the lights the rolling session delivered since the last call.
    ///
    /// A light at an address the room already knows replaces the old entry.
    /// Returns how many lights were taken in.
    pub fn admit(&mut self) -> usize {
        let Some(session) = &mut self.session else {
            return 0;
        };
        let found = session.drain();
        let count = found.len();
        for device in found {
            self.upsert(device);
        }
        if count > 0 {
            debug!("room {:?} admitted {count} light(s)", self.name);
        }
        count
    }

    /// Set every light to a static color, one after another.
    pub async fn apply_color(
        &mut self,
        power: Power,
        color: Color,
    ) -> Vec<(SocketAddrV4, Result<()>)> {
        self.admit();
        let mut results = Vec::with_capacity(self.lights.len());
        for device in self.lights.values_mut() {
            let result = device.set_color(power, color).await;
            if let Err(e) = &result {
                warn!("{}: could not set color: {e}", device.address());
            }
            results.push((device.address(), result));
        }
        results
    }

    /// Run a transition on every light in the room.
    ///
    /// If any light failed and no rolling session is active, the membership
    /// is rebuilt with one rediscovery pass. A failed rediscovery is logged,
    /// not returned.
    pub async fn apply_transition(
        &mut self,
        request: &TransitionRequest,
    ) -> Result<TransitionReport> {
        self.admit();
        let report = {
            let mut targets: Vec<&mut dyn Device> = self
                .lights
                .values_mut()
                .map(|device| &mut **device as &mut dyn Device)
                .collect();
            self.scheduler.run(&mut targets, request).await?
        };
        if report.any_failed() {
            self.recover().await;
        }
        Ok(report)
    }

    /// Run a transition on the light(s) at `ip` only.
    ///
    /// Without an explicit end state the light holds the final start step as
    /// a static color.
    pub async fn apply_transition_to_one(
        &mut self,
        ip: Ipv4Addr,
        request: &TransitionRequest,
    ) -> Result<TransitionReport> {
        self.admit();
        let request = request.clone().hold_final_step();
        let mut targets: Vec<&mut dyn Device> = self
            .lights
            .values_mut()
            .filter(|device| *device.address().ip() == ip)
            .map(|device| &mut **device as &mut dyn Device)
            .collect();
        if targets.is_empty() {
            return Err(Error::DeviceNotFound(ip));
        }
        self.scheduler.run(&mut targets, &request).await
    }

    /// Read the state of every light.
    pub async fn refresh(&mut self) -> Vec<(SocketAddrV4, Result<LightState>)> {
        self.admit();
        let mut states = Vec::with_capacity(self.lights.len());
        for device in self.lights.values_mut() {
            states.push((device.address(), device.read_state().await));
        }
        states
    }

    /// Add a light to this room.
    ///
    /// Returns the UUID assigned to the light.
    pub fn new_light(&mut self, device: Box<dyn Device>) -> Result<Uuid> {
        let address = device.address();
        if self.find(address).is_some() {
            return Err(Error::invalid_address(&address, "already known"));
        }
        let id = Uuid::new_v4();
        self.lights.insert(id, device);
        Ok(id)
    }

    /// Remove a light from this room.
    pub fn delete_light(&mut self, light_id: &Uuid) -> Result<()> {
        self.lights
            .remove(light_id)
            .map(|_| ())
            .ok_or_else(|| Error::light_not_found(&self.name, light_id))
    }

    /// List all light IDs in this room.
    ///
    /// ```
    /// use elgato_lights_rs::{Light, Room};
    ///
    /// let mut room = Room::new("test");
    /// assert!(room.list().is_empty());
    ///
    /// let light = Light::new("10.1.2.3:9123".parse().unwrap(), None, reqwest::Client::new());
    /// let light_id = room.new_light(Box::new(light)).unwrap();
    /// assert_eq!(room.list(), vec![&light_id]);
    /// ```
    pub fn list(&self) -> Vec<&Uuid> {
        self.lights.keys().collect()
    }

    pub fn read(&self, light_id: &Uuid) -> Option<&dyn Device> {
        self.lights
            .get(light_id)
            .map(|device| &**device as &dyn Device)
    }

    pub fn read_mut(&mut self, light_id: &Uuid) -> Option<&mut dyn Device> {
        self.lights
            .get_mut(light_id)
            .map(|device| &mut **device as &mut dyn Device)
    }

    fn find(&self, address: SocketAddrV4) -> Option<Uuid> {
        self.lights
            .iter()
            .find(|(_, device)| device.address() == address)
            .map(|(id, _)| *id)
    }

    fn upsert(&mut self, device: Box<dyn Device>) {
        let id = self.find(device.address()).unwrap_or_else(Uuid::new_v4);
        self.lights.insert(id, device);
    }

    fn replace_members(&mut self, found: DeviceMap) {
        self.lights.clear();
        for (product, devices) in found {
            debug!("{} x {product}", devices.len());
            for device in devices {
                self.upsert(device);
            }
        }
    }

    async fn recover(&mut self) {
        if self.is_rolling() {
            warn!(
                "transition failed in room {:?}; rolling discovery will pick lights back up",
                self.name
            );
            return;
        }
        if self.discovery.is_none() {
            warn!("transition failed in room {:?}", self.name);
            return;
        }
        info!("transition failed in room {:?}, rediscovering", self.name);
        if let Err(e) = self.setup(Some(self.config.timeout)).await {
            warn!("rediscovery for room {:?} failed: {e}", self.name);
        }
    }
}
