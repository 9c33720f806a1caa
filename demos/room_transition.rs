//! Fade a group of lights up, then switch them all off.
//!
//! This example demonstrates:
//! - Building a room from a fixed list of addresses
//! - Running one transition across every light
//! - Watching progress with a custom observer
//!
//! Run with: cargo run --example room_transition -- 192.168.1.20:9123 192.168.1.21:9123

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;

use elgato_lights_rs::{
    Color, Config, EndState, Error, LogObserver, ManualDiscovery, Room, SceneStep,
    TransitionObserver, TransitionRequest, TransitionScheduler,
};

/// Prints each light as it starts and finishes, and logs the rest.
struct Printer;

impl TransitionObserver for Printer {
    fn started(&self, address: SocketAddrV4, hold: Duration, result: &Result<(), Error>) {
        match result {
            Ok(()) => println!("  ▶ {address} started, done in {hold:?}"),
            Err(e) => println!("  ✗ {address} did not start: {e}"),
        }
    }

    fn waiting(&self, pending: usize, next_due: Duration) {
        LogObserver.waiting(pending, next_due);
    }

    fn finished(&self, address: SocketAddrV4, result: &Result<(), Error>) {
        match result {
            Ok(()) => println!("  ✓ {address} off"),
            Err(e) => println!("  ✗ {address} did not switch off: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let addresses = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<SocketAddrV4>())
        .collect::<Result<Vec<_>, _>>()?;
    if addresses.is_empty() {
        println!("Pass one or more light addresses, e.g. 192.168.1.20:9123");
        return Ok(());
    }

    let config = Config::default();
    let discovery = ManualDiscovery::new(addresses, config.http.client()?);
    let scheduler =
        TransitionScheduler::new(config.transition.clone()).with_observer(Arc::new(Printer));
    let mut room = Room::with_discovery("Demo", Arc::new(discovery), &config).with_scheduler(scheduler);

    if !room.setup(Some(Duration::from_secs(5))).await? {
        println!("No lights answered.");
        return Ok(());
    }
    println!("Found {} light(s)", room.len());

    // Warm up to full white over a second, hold for two, then switch off.
    let request = TransitionRequest::from_steps(vec![
        SceneStep::new(Color::create(30.0, 40.0, 100.0).ok_or("bad color")?, 1000, 1000),
        SceneStep::new(Color::white(100.0), 2000, 0),
    ])?
    .with_end(EndState::color(Color::off()));

    let report = room.apply_transition(&request).await?;
    if report.is_success() {
        println!("\nDone!");
    } else {
        println!("\n{} light(s) failed", report.failures().count());
    }
    Ok(())
}
