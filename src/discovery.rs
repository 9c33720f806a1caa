//! Finding lights on the network.
//!
//! Discovery comes in two shapes: a one-shot scan that returns everything it
//! found within a timeout, and a rolling session that keeps delivering lights
//! as they appear until it is cancelled. Both sit behind the [`Discovery`]
//! trait so rooms can be driven by any source.

use std::collections::HashMap;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::device::Device;
use crate::errors::Error;
use crate::light::Light;
use crate::runtime::{self, BoxFuture, Instant, JoinHandle};

type Result<T> = std::result::Result<T, Error>;

/// Lights grouped by product name.
pub type DeviceMap = HashMap<String, Vec<Box<dyn Device>>>;

/// A source of lights.
pub trait Discovery: Send + Sync {
    /// Scan for `timeout` and return every light that answered.
    fn discover<'a>(
        &'a self,
        service_type: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<DeviceMap>>;

    /// Start a session that keeps delivering lights until cancelled.
    fn start_continuous<'a>(
        &'a self,
        service_type: &'a str,
    ) -> BoxFuture<'a, Result<DiscoverySession>>;
}

/// Producer half of a rolling discovery session.
#[derive(Clone)]
pub struct DiscoverySender {
    sender: UnboundedSender<Box<dyn Device>>,
    running: Arc<AtomicBool>,
}

impl DiscoverySender {
    /// Hand a light to the session. Returns `false` once the session is gone.
    pub fn admit(&self, device: Box<dyn Device>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.sender.unbounded_send(device).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        !self.running.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}

/// A running rolling discovery.
///
/// Lights found by the session queue up until [`DiscoverySession::drain`]
/// collects them. Dropping the session cancels it.
///
/// ```
/// use elgato_lights_rs::{Device, DiscoverySession, Light};
///
/// let (sender, mut session) = DiscoverySession::channel();
/// let light = Light::new("10.0.0.4:9123".parse().unwrap(), None, reqwest::Client::new());
/// assert!(sender.admit(Box::new(light)));
///
/// let found = session.drain();
/// assert_eq!(found[0].address().to_string(), "10.0.0.4:9123");
///
/// session.cancel();
/// assert!(!session.is_active());
/// assert!(sender.is_cancelled());
/// ```
pub struct DiscoverySession {
    receiver: UnboundedReceiver<Box<dyn Device>>,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl DiscoverySession {
    /// A connected sender and session with no background task.
    pub fn channel() -> (DiscoverySender, DiscoverySession) {
        let (sender, receiver) = mpsc::unbounded();
        let running = Arc::new(AtomicBool::new(true));
        (
            DiscoverySender {
                sender,
                running: Arc::clone(&running),
            },
            DiscoverySession {
                receiver,
                running,
                task: None,
            },
        )
    }

    /// Tie a background task to the session; it is aborted on cancel.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Take every light delivered since the last drain.
    pub fn drain(&mut self) -> Vec<Box<dyn Device>> {
        let mut found = Vec::new();
        while let Ok(device) = self.receiver.try_recv() {
            found.push(device);
        }
        found
    }

    pub fn cancel(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("cancelling discovery session");
        }
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Discovery over a fixed list of addresses.
///
/// Each address is contacted with [`Light::connect`]; those that answer are
/// returned, grouped by product name. The service type is not used since
/// nothing is browsed.
#[derive(Debug, Clone)]
pub struct ManualDiscovery {
    addresses: Vec<SocketAddrV4>,
    client: reqwest::Client,
    rescan_interval: Duration,
}

/// What a rolling session remembers about an admitted light:
/// product name, display name and serial number.
type Identity = (String, Option<String>, Option<String>);

fn identity(light: &Light) -> Identity {
    match light.accessory_info() {
        Some(info) => (
            info.product_name.clone(),
            info.display_name.clone(),
            info.serial_number.clone(),
        ),
        None => Default::default(),
    }
}

impl ManualDiscovery {
    pub fn new(addresses: Vec<SocketAddrV4>, client: reqwest::Client) -> Self {
        ManualDiscovery {
            addresses,
            client,
            rescan_interval: DiscoveryConfig::default().rescan_interval,
        }
    }

    pub fn with_config(mut self, config: &DiscoveryConfig) -> Self {
        self.rescan_interval = config.rescan_interval;
        self
    }

    pub fn addresses(&self) -> &[SocketAddrV4] {
        &self.addresses
    }

    /// Contact every address at once and keep the lights that answer
    /// before `timeout`. Addresses still pending at the deadline are
    /// dropped; everything already connected is returned.
    pub async fn scan(&self, timeout: Duration) -> DeviceMap {
        let mut pending: FuturesUnordered<_> = self
            .addresses
            .iter()
            .map(|address| async move {
                let result = Light::connect(*address, None, self.client.clone()).await;
                (*address, result)
            })
            .collect();

        let deadline = Instant::now() + timeout;
        let mut found = DeviceMap::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let next = runtime::timeout(remaining, pending.next()).await;
            match next {
                Ok(Some((_, Ok(light)))) => {
                    let product = light.product_name().unwrap_or("unknown").to_string();
                    found.entry(product).or_default().push(Box::new(light));
                }
                Ok(Some((address, Err(e)))) => warn!("no light at {address}: {e}"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "{} address(es) did not answer within {timeout:?}",
                        pending.len()
                    );
                    break;
                }
            }
        }
        found
    }
}

impl Discovery for ManualDiscovery {
    fn discover<'a>(
        &'a self,
        service_type: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<DeviceMap>> {
        Box::pin(async move {
            debug!(
                "contacting {} address(es) for {service_type}",
                self.addresses.len()
            );
            Ok(self.scan(timeout).await)
        })
    }

    /// Every address is contacted again on each pass. A light is admitted
    /// the first time it answers, and again whenever its product name,
    /// display name or serial number differs from what was last admitted
    /// for that address, e.g. after a device was swapped.
    fn start_continuous<'a>(
        &'a self,
        service_type: &'a str,
    ) -> BoxFuture<'a, Result<DiscoverySession>> {
        Box::pin(async move {
            info!("starting rolling discovery for {service_type}");
            let (sender, session) = DiscoverySession::channel();
            let addresses = self.addresses.clone();
            let client = self.client.clone();
            let interval = self.rescan_interval;

            let task = runtime::spawn(async move {
                let mut admitted: HashMap<SocketAddrV4, Identity> = HashMap::new();
                while !sender.is_cancelled() {
                    for address in &addresses {
                        let light = match Light::connect(*address, None, client.clone()).await {
                            Ok(light) => light,
                            Err(e) => {
                                debug!("{address} not answering: {e}");
                                continue;
                            }
                        };
                        let current = identity(&light);
                        match admitted.get(address) {
                            Some(known) if *known == current => continue,
                            Some(_) => info!("{address} is now {}, admitting it again", current.0),
                            None => {}
                        }
                        if !sender.admit(Box::new(light)) {
                            return;
                        }
                        admitted.insert(*address, current);
                    }
                    runtime::sleep(interval).await;
                }
            });
            Ok(session.with_task(task))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::config::{DEFAULT_SERVICE_TYPE, ProductKind};
    use crate::mock::{
        CallLog, MockDevice, light_reply, local_client, mock_address, serve_light, strip_api,
    };
    use crate::types::Color;

    #[test]
    fn test_session_drains_in_order() {
        let log = CallLog::default();
        let (sender, mut session) = DiscoverySession::channel();
        assert!(session.drain().is_empty());

        for id in [3, 1, 2] {
            assert!(sender.admit(MockDevice::in_color(id, Color::off(), &log).boxed()));
        }
        let found: Vec<SocketAddrV4> = session.drain().iter().map(|d| d.address()).collect();
        assert_eq!(found, vec![mock_address(3), mock_address(1), mock_address(2)]);
        assert!(session.drain().is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn test_dropping_session_stops_sender() {
        let log = CallLog::default();
        let (sender, session) = DiscoverySession::channel();
        drop(session);
        assert!(sender.is_cancelled());
        assert!(!sender.admit(MockDevice::in_scene(1, &log).boxed()));
    }

    #[tokio::test]
    async fn test_manual_discovery_without_addresses() {
        let discovery = ManualDiscovery::new(Vec::new(), reqwest::Client::new());
        let found = discovery
            .discover("_elg._tcp.local.", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rolling_session_cancel_aborts_task() {
        let discovery = ManualDiscovery::new(Vec::new(), reqwest::Client::new());
        let mut session = discovery.start_continuous("_elg._tcp.local.").await.unwrap();
        assert!(session.is_active());
        runtime::sleep(Duration::from_secs(12)).await;
        assert!(session.drain().is_empty());

        session.cancel();
        assert!(!session.is_active());
        assert!(session.task.is_none());
    }

    #[tokio::test]
    async fn test_discover_keeps_lights_that_answered() {
        let answering = serve_light(strip_api(200)).await;
        let silent = serve_light(|_: &str, _: &str| None).await;
        let discovery = ManualDiscovery::new(vec![silent, answering], local_client());

        let started = Instant::now();
        let found = discovery
            .discover(DEFAULT_SERVICE_TYPE, Duration::from_millis(1500))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(found.len(), 1);
        let strips = &found["Elgato Light Strip"];
        assert_eq!(strips.len(), 1);
        assert_eq!(strips[0].address(), answering);
    }

    #[tokio::test]
    async fn test_rolling_session_readmits_changed_light() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&lookups);
        // First identification says strip, every later one says key light.
        let address = serve_light(move |method: &str, path: &str| {
            let product = if path == "/elgato/accessory-info"
                && counter.fetch_add(1, Ordering::SeqCst) > 0
            {
                "Elgato Key Light"
            } else {
                "Elgato Light Strip"
            };
            light_reply(product, 200, method, path)
        })
        .await;

        let config = DiscoveryConfig {
            rescan_interval: Duration::from_millis(50),
            ..DiscoveryConfig::default()
        };
        let discovery = ManualDiscovery::new(vec![address], local_client()).with_config(&config);
        let mut session = discovery.start_continuous(DEFAULT_SERVICE_TYPE).await.unwrap();

        let mut admitted = Vec::new();
        let started = Instant::now();
        while admitted.len() < 2 && started.elapsed() < Duration::from_secs(5) {
            admitted.extend(session.drain().iter().map(|d| (d.address(), d.kind())));
            runtime::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            admitted,
            vec![(address, ProductKind::LightStrip), (address, ProductKind::KeyLight)]
        );

        // unchanged from here on
        runtime::sleep(Duration::from_millis(300)).await;
        assert!(lookups.load(Ordering::SeqCst) > 2);
        assert!(session.drain().is_empty());
        session.cancel();
    }
}
