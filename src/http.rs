//! HTTP transport for the Elgato REST API.

use std::net::SocketAddrV4;
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::Display;

use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::runtime::Mutex;

type Result<T> = std::result::Result<T, Error>;

/// Resources a light serves below `/elgato/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum Endpoint {
    #[strum(serialize = "accessory-info")]
    AccessoryInfo,
    #[strum(serialize = "lights")]
    Lights,
    #[strum(serialize = "lights/settings")]
    Settings,
}

/// Talks to one light. Every call is a single attempt; callers decide what a
/// failure means.
#[derive(Debug, Clone)]
pub(crate) struct DeviceClient {
    http: reqwest::Client,
    address: SocketAddrV4,
    history: Arc<Mutex<MessageHistory>>,
}

impl DeviceClient {
    pub fn new(http: reqwest::Client, address: SocketAddrV4) -> Self {
        DeviceClient {
            http,
            address,
            history: Arc::new(Mutex::new(MessageHistory::new())),
        }
    }

    pub fn history(&self) -> &Arc<Mutex<MessageHistory>> {
        &self.history
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("http://{}/elgato/{}", self.address, endpoint)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T> {
        let action = format!("GET {endpoint}");
        self.history
            .lock()
            .await
            .record(MessageType::Request, &action, &Value::Null);

        let result = self.fetch(&action, endpoint).await;
        self.finish(&action, result).await
    }

    pub async fn put<T: Serialize>(&self, endpoint: Endpoint, body: &T) -> Result<()> {
        let action = format!("PUT {endpoint}");
        let body = serde_json::to_value(body).map_err(Error::JsonDump)?;
        self.history
            .lock()
            .await
            .record(MessageType::Request, &action, &body);

        let result = self.send(&action, endpoint, &body).await;
        self.finish(&action, result).await
    }

    async fn fetch<T: DeserializeOwned>(&self, action: &str, endpoint: Endpoint) -> Result<(T, Value)> {
        let response = self
            .http
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| Error::unreachable(self.address, action, e))?;
        check_status(self.address, action, response.status().as_u16())?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::unreachable(self.address, action, e))?;
        let raw: Value =
            serde_json::from_slice(&bytes).map_err(|e| Error::malformed(self.address, e))?;
        let parsed = serde_json::from_value(raw.clone())
            .map_err(|e| Error::malformed(self.address, format!("{action}: {e}")))?;
        Ok((parsed, raw))
    }

    async fn send(&self, action: &str, endpoint: Endpoint, body: &Value) -> Result<((), Value)> {
        let response = self
            .http
            .put(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::unreachable(self.address, action, e))?;
        let status = response.status().as_u16();
        check_status(self.address, action, status)?;
        Ok(((), Value::from(status)))
    }

    async fn finish<T>(&self, action: &str, result: Result<(T, Value)>) -> Result<T> {
        let mut history = self.history.lock().await;
        match result {
            Ok((value, raw)) => {
                debug!("{} {}: {}", self.address, action, raw);
                history.record(MessageType::Response, action, &raw);
                Ok(value)
            }
            Err(e) => {
                debug!("{} {} failed: {}", self.address, action, e);
                history.record_error(action, &e.to_string());
                Err(e)
            }
        }
    }
}

/// Any 2xx status is success.
pub(crate) fn check_status(address: SocketAddrV4, action: &str, status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::rejected(address, action, status))
    }
}
