//! In-memory lights and discovery for tests.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::{DEFAULT_PORT, ProductKind};
use crate::device::Device;
use crate::discovery::{DeviceMap, Discovery, DiscoverySender, DiscoverySession};
use crate::errors::Error;
use crate::runtime::{BoxFuture, Instant};
use crate::scheduler::TransitionRequest;
use crate::state::LightState;
use crate::types::{Color, Power, Scene};

type Result<T> = std::result::Result<T, Error>;

pub(crate) fn mock_address(id: u8) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, id), DEFAULT_PORT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Read,
    Color,
    Scene,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub device: u8,
    pub kind: CallKind,
    pub name: Option<String>,
    pub steps: usize,
    pub at: Instant,
}

impl Call {
    /// A scene under the default transition label.
    pub fn is_start(&self) -> bool {
        self.kind == CallKind::Scene && self.name.as_deref() == Some(TransitionRequest::DEFAULT_NAME)
    }

    pub fn is_end(&self) -> bool {
        match self.kind {
            CallKind::Color => true,
            CallKind::Scene => !self.is_start(),
            CallKind::Read => false,
        }
    }
}

/// Calls made on any number of mock devices, in order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn push(&self, device: u8, kind: CallKind, name: Option<&str>, steps: usize) {
        self.0.lock().unwrap().push(Call {
            device,
            kind,
            name: name.map(String::from),
            steps,
            at: Instant::now(),
        });
    }
}

#[derive(Debug)]
pub(crate) struct MockDevice {
    id: u8,
    state: Option<LightState>,
    log: CallLog,
    fail_reads: bool,
    fail_scenes: bool,
    fail_colors: bool,
}

impl MockDevice {
    pub fn in_color(id: u8, color: Color, log: &CallLog) -> Self {
        MockDevice {
            id,
            state: Some(LightState::color(Power::On, color)),
            log: log.clone(),
            fail_reads: false,
            fail_scenes: false,
            fail_colors: false,
        }
    }

    pub fn in_scene(id: u8, log: &CallLog) -> Self {
        MockDevice {
            state: Some(LightState::scene(&Scene::new(), "idle", "idle-id")),
            ..Self::in_color(id, Color::off(), log)
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_scenes(mut self) -> Self {
        self.fail_scenes = true;
        self
    }

    pub fn failing_colors(mut self) -> Self {
        self.fail_colors = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Device> {
        Box::new(self)
    }

    fn rejected(&self) -> Error {
        Error::rejected(self.address(), "PUT lights", 503)
    }
}

impl Device for MockDevice {
    fn address(&self) -> SocketAddrV4 {
        mock_address(self.id)
    }

    fn name(&self) -> Option<&str> {
        None
    }

    fn kind(&self) -> ProductKind {
        ProductKind::LightStrip
    }

    fn state(&self) -> Option<&LightState> {
        self.state.as_ref()
    }

    fn read_state(&mut self) -> BoxFuture<'_, Result<LightState>> {
        self.log.push(self.id, CallKind::Read, None, 0);
        let result = match (&self.state, self.fail_reads) {
            (Some(state), false) => Ok(state.clone()),
            _ => Err(Error::malformed(self.address(), "mock read failure")),
        };
        Box::pin(std::future::ready(result))
    }

    fn set_color(&mut self, power: Power, color: Color) -> BoxFuture<'_, Result<()>> {
        self.log.push(self.id, CallKind::Color, None, 1);
        let result = if self.fail_colors {
            Err(self.rejected())
        } else {
            self.state = Some(LightState::color(power, color));
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }

    fn set_scene<'a>(
        &'a mut self,
        scene: &'a Scene,
        name: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        self.log
            .push(self.id, CallKind::Scene, Some(name), scene.len());
        let result = if self.fail_scenes {
            Err(self.rejected())
        } else {
            self.state = Some(LightState::scene(scene, name, id));
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }
}

/// Discovery that hands out fresh mock devices and counts how often it ran.
pub(crate) struct MockDiscovery {
    ids: Vec<u8>,
    log: CallLog,
    discover_calls: AtomicUsize,
    continuous_calls: AtomicUsize,
    sender: Mutex<Option<DiscoverySender>>,
}

impl MockDiscovery {
    pub fn new(ids: &[u8], log: &CallLog) -> Self {
        MockDiscovery {
            ids: ids.to_vec(),
            log: log.clone(),
            discover_calls: AtomicUsize::new(0),
            continuous_calls: AtomicUsize::new(0),
            sender: Mutex::new(None),
        }
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn continuous_calls(&self) -> usize {
        self.continuous_calls.load(Ordering::SeqCst)
    }

    /// Deliver a device through the running continuous session.
    pub fn announce(&self, device: MockDevice) -> bool {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|sender| sender.admit(device.boxed()))
    }

    fn devices(&self) -> Vec<Box<dyn Device>> {
        self.ids
            .iter()
            .map(|id| MockDevice::in_color(*id, Color::white(100.0), &self.log).boxed())
            .collect()
    }
}

impl Discovery for MockDiscovery {
    fn discover<'a>(
        &'a self,
        _service_type: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<DeviceMap>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        let map = HashMap::from([("Elgato Light Strip".to_string(), self.devices())]);
        Box::pin(std::future::ready(Ok(map)))
    }

    fn start_continuous<'a>(&'a self, _service_type: &'a str) -> BoxFuture<'a, Result<DiscoverySession>> {
        self.continuous_calls.fetch_add(1, Ordering::SeqCst);
        let (sender, session) = DiscoverySession::channel();
        for device in self.devices() {
            sender.admit(device);
        }
        *self.sender.lock().unwrap() = Some(sender);
        Box::pin(std::future::ready(Ok(session)))
    }
}

/// Client for the loopback servers below, ignoring any proxy settings.
pub(crate) fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// A loopback address nobody listens on.
pub(crate) fn closed_address() -> SocketAddrV4 {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
}

/// Serve a fake light on a loopback port for the rest of the test.
///
/// The handler gets the method and path of each request and returns the
/// status and JSON body to send, or `None` to keep the connection open
/// without ever answering.
pub(crate) async fn serve_light<F>(handler: F) -> SocketAddrV4
where
    F: Fn(&str, &str) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let Some((method, path)) = read_request(&mut stream).await else {
                    return;
                };
                let Some((status, body)) = handler(&method, &path) else {
                    std::future::pending::<()>().await;
                    return;
                };
                let response = format!(
                    "HTTP/1.1 {status} Fake\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
}

/// Read one request and return its method and path. The body is consumed
/// and ignored.
async fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.split_whitespace();
    Some((
        request_line.next()?.to_string(),
        request_line.next()?.to_string(),
    ))
}

/// Replies of a healthy light with the given product name. It shows a static
/// color and answers every PUT with `put_status`.
pub(crate) fn light_reply(
    product: &str,
    put_status: u16,
    method: &str,
    path: &str,
) -> Option<(u16, String)> {
    let body = match (method, path) {
        ("GET", "/elgato/accessory-info") => {
            json!({"productName": product, "displayName": "Strip", "features": ["lights"]})
        }
        ("GET", "/elgato/lights") => json!({
            "numberOfLights": 1,
            "lights": [{"on": 1, "hue": 40.0, "saturation": 70.0, "brightness": 30}]
        }),
        ("PUT", "/elgato/lights") | ("PUT", "/elgato/lights/settings") => {
            return Some((put_status, "{}".to_string()));
        }
        _ => return Some((404, "{}".to_string())),
    };
    Some((200, body.to_string()))
}

/// A light strip answering every PUT with `put_status`.
pub(crate) fn strip_api(
    put_status: u16,
) -> impl Fn(&str, &str) -> Option<(u16, String)> + Send + Sync + 'static {
    move |method: &str, path: &str| light_reply("Elgato Light Strip", put_status, method, path)
}
