//! Individual light control.

use std::net::SocketAddrV4;

use log::{info, warn};
use serde_json::{Value, json};

use crate::config::{AccessoryInfo, LightSettings, ProductKind};
use crate::device::Device;
use crate::errors::Error;
use crate::history::MessageHistory;
use crate::http::{DeviceClient, Endpoint};
use crate::runtime::BoxFuture;
use crate::state::{LightState, LightsDocument};
use crate::types::{Color, Power, Scene};

type Result<T> = std::result::Result<T, Error>;

/// Represents a single Elgato light.
///
/// A `Light` talks to the physical device over its HTTP API. Each light is
/// identified by its IPv4 address and port and can optionally have a
/// user-friendly name. Its [`ProductKind`] decides which operations it
/// accepts: only light strips play scenes.
///
/// # Example
///
/// ```
/// use elgato_lights_rs::{Device, Light, ProductKind};
///
/// let client = reqwest::Client::new();
/// let light = Light::new("192.168.1.100:9123".parse().unwrap(), Some("Desk"), client);
/// assert_eq!(light.kind(), ProductKind::Unknown);
/// assert!(light.state().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Light {
    address: SocketAddrV4,
    name: Option<String>,
    kind: ProductKind,
    info: Option<AccessoryInfo>,
    state: Option<LightState>,
    client: DeviceClient,
}

impl Light {
    /// Create a light without contacting it. Its kind stays
    /// [`ProductKind::Unknown`] until [`Light::identify`] succeeds.
    pub fn new(address: SocketAddrV4, name: Option<&str>, client: reqwest::Client) -> Self {
        Light {
            address,
            name: name.map(String::from),
            kind: ProductKind::Unknown,
            info: None,
            state: None,
            client: DeviceClient::new(client, address),
        }
    }

    /// Contact a light, detect its product type and read its state.
    pub async fn connect(
        address: SocketAddrV4,
        name: Option<&str>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let mut light = Light::new(address, name, client);
        let info = light.identify().await?;
        if light.kind == ProductKind::Unknown {
            warn!(
                "no specific support for product {:?} at {}, treating it as a static light",
                info.product_name, address
            );
        }
        info!(
            "adding {}: {}",
            info.product_name,
            info.display_name.as_deref().unwrap_or("")
        );
        light.read_state().await?;
        Ok(light)
    }

    /// Fetch accessory info and update the product kind from it.
    pub async fn identify(&mut self) -> Result<AccessoryInfo> {
        let info: AccessoryInfo = self.client.get(Endpoint::AccessoryInfo).await?;
        self.kind = info.kind();
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Accessory info from the last [`Light::identify`].
    pub fn accessory_info(&self) -> Option<&AccessoryInfo> {
        self.info.as_ref()
    }

    /// Product name from accessory info, if identified.
    pub fn product_name(&self) -> Option<&str> {
        self.info.as_ref().map(|info| info.product_name.as_str())
    }

    pub async fn settings(&self) -> Result<LightSettings> {
        self.client.get(Endpoint::Settings).await
    }

    pub async fn set_settings(&self, settings: &LightSettings) -> Result<()> {
        self.client.put(Endpoint::Settings, settings).await
    }

    pub async fn history(&self) -> MessageHistory {
        self.client.history().lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.client.history().lock().await.clear();
    }

    /// Returns diagnostics including identity, last known state and history.
    pub async fn diagnostics(&self) -> Value {
        let history = self.client.history().lock().await;
        json!({
            "address": self.address.to_string(),
            "name": self.name,
            "kind": self.kind.to_string(),
            "accessory_info": self.info,
            "state": self.state,
            "history": serde_json::to_value(history.summary()).unwrap_or(Value::Null),
        })
    }

    async fn fetch_state(&mut self) -> Result<LightState> {
        let doc: LightsDocument = self.client.get(Endpoint::Lights).await?;
        let state = LightState::from_document(self.address, doc)?;
        self.state = Some(state.clone());
        Ok(state)
    }

    async fn put_color(&mut self, power: Power, color: Color) -> Result<()> {
        let doc = LightsDocument::color(power, &color, self.kind.supports_hue());
        self.client.put(Endpoint::Lights, &doc).await?;
        self.state = Some(LightState::color(power, color));
        Ok(())
    }

    async fn put_scene(&mut self, scene: &Scene, name: &str, id: &str) -> Result<()> {
        if !self.kind.supports_scenes() {
            return Err(Error::unsupported(
                self.address,
                self.product_name().unwrap_or("unidentified light"),
                "scenes",
            ));
        }
        let doc = LightsDocument::scene(scene, name, id);
        self.client.put(Endpoint::Lights, &doc).await?;
        self.state = Some(LightState::scene(scene, name, id));
        Ok(())
    }
}

impl Device for Light {
    fn address(&self) -> SocketAddrV4 {
        self.address
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn kind(&self) -> ProductKind {
        self.kind
    }

    fn state(&self) -> Option<&LightState> {
        self.state.as_ref()
    }

    fn read_state(&mut self) -> BoxFuture<'_, Result<LightState>> {
        Box::pin(self.fetch_state())
    }

    fn set_color(&mut self, power: Power, color: Color) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.put_color(power, color))
    }

    fn set_scene<'a>(
        &'a mut self,
        scene: &'a Scene,
        name: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.put_scene(scene, name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{closed_address, light_reply, local_client, serve_light, strip_api};
    use crate::types::SceneStep;

    fn light() -> Light {
        Light::new(
            "10.0.0.9:9123".parse().unwrap(),
            Some("Shelf"),
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_unidentified_light_rejects_scenes() {
        let mut light = light();
        let err = light.set_scene(&Scene::new(), "x", "y").await.unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
        assert!(light.state().is_none());
        // rejected locally, nothing went out
        assert!(light.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_diagnostics_shape() {
        let light = light();
        let diag = light.diagnostics().await;
        assert_eq!(diag["address"], "10.0.0.9:9123");
        assert_eq!(diag["name"], "Shelf");
        assert_eq!(diag["kind"], "Unknown");
        assert_eq!(diag["history"]["total_entries"], 0);
    }

    #[test]
    fn test_current_color_follows_state() {
        let mut light = light();
        assert!(light.current_color().is_none());

        light.state = Some(LightState::color(Power::On, Color::white(30.0)));
        assert_eq!(light.current_color(), Some(Color::white(30.0)));

        light.state = Some(LightState::scene(&Scene::new(), "s", "s-id"));
        assert!(light.current_color().is_none());
    }

    #[tokio::test]
    async fn test_connect_identifies_strip() {
        let address = serve_light(strip_api(200)).await;
        let light = Light::connect(address, Some("Shelf"), local_client())
            .await
            .unwrap();

        assert_eq!(light.kind(), ProductKind::LightStrip);
        assert_eq!(light.product_name(), Some("Elgato Light Strip"));
        assert_eq!(light.current_color(), Color::create(40.0, 70.0, 30.0));
        assert_eq!(light.state().unwrap().power(), Power::On);

        let summary = light.history().await.summary();
        assert_eq!((summary.requests, summary.responses, summary.failures), (2, 2, 0));
    }

    #[tokio::test]
    async fn test_accepted_puts_update_state() {
        let address = serve_light(strip_api(200)).await;
        let mut light = Light::connect(address, None, local_client()).await.unwrap();

        light.set_color(Power::On, Color::white(80.0)).await.unwrap();
        assert_eq!(light.current_color(), Some(Color::white(80.0)));

        let scene = Scene::from_steps(vec![SceneStep::new(Color::white(10.0), 500, 100)]);
        light.set_scene(&scene, "dim", "dim-id").await.unwrap();
        assert!(light.current_color().is_none());
        assert_eq!(light.history().await.summary().failures, 0);
    }

    #[tokio::test]
    async fn test_rejected_put_keeps_state() {
        let address = serve_light(strip_api(400)).await;
        let mut light = Light::connect(address, None, local_client()).await.unwrap();
        let before = light.state().cloned();

        let err = light.set_color(Power::Off, Color::off()).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { status: 400, .. }));
        assert_eq!(light.state(), before.as_ref());

        let history = light.history().await;
        assert!(history.last_error().unwrap().contains("status 400"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let address = serve_light(|method: &str, path: &str| match path {
            "/elgato/lights" => Some((200, "<html>busy</html>".to_string())),
            _ => light_reply("Elgato Light Strip", 200, method, path),
        })
        .await;

        let err = Light::connect(address, None, local_client()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert!(err.is_device_failure());
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let address = closed_address();
        let err = Light::connect(address, None, local_client()).await.unwrap_err();
        assert!(matches!(err, Error::Unreachable { address: a, .. } if a == address));
    }
}
