//! CLI application for controlling Elgato lights.
//!
//! This example demonstrates a command-line interface over single lights and
//! over a room built from a list of addresses.
//!
//! Run with: cargo run --example elgato_cli -- --help
//! Set `RUST_LOG=debug` to see the transition scheduler at work.

use clap::{Parser, Subcommand};
use elgato_lights_rs::{
    Color, Config, Device, Discovery, EndState, Light, ManualDiscovery, Power, Room, Scene,
    SceneStep, TransitionRequest,
};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "elgato-cli")]
#[command(about = "Control Elgato lights from the command line", long_about = None)]
struct Cli {
    /// IP address of the light (not required for discover and room commands)
    #[arg(short, long, global = true)]
    ip: Option<Ipv4Addr>,

    /// HTTP port of the light
    #[arg(short, long, global = true, default_value_t = elgato_lights_rs::DEFAULT_PORT)]
    port: u16,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a list of addresses and report which answer
    Discover {
        /// Addresses to probe, e.g. 192.168.1.20:9123
        addresses: Vec<SocketAddrV4>,
    },

    /// Show product information
    Info,

    /// Get the current state of the light
    Status,

    /// Turn the light on at full white
    On,

    /// Turn the light off
    Off,

    /// Set a static color as "hue,saturation,brightness"
    Color { color: Color },

    /// Play a looping scene, steps as "h,s,b,duration_ms,transition_ms"
    Scene {
        #[arg(required = true)]
        steps: Vec<SceneStep>,
        #[arg(long, default_value = "cli-scene")]
        name: String,
    },

    /// Play steps once, then switch to an end state
    Transition {
        #[arg(required = true)]
        steps: Vec<SceneStep>,
        /// End steps: none keeps a named placeholder, one sets a color, more loop
        #[arg(long = "end")]
        end: Vec<SceneStep>,
    },

    /// Run a transition on every light at the given addresses
    Room {
        #[arg(short, long = "light", required = true)]
        lights: Vec<SocketAddrV4>,
        #[arg(required = true)]
        steps: Vec<SceneStep>,
        #[arg(long = "end")]
        end: Vec<SceneStep>,
    },

    /// Get light settings
    Settings,

    /// Get detailed diagnostics
    Diagnostics,
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(Config::default()),
    }
}

fn request(
    steps: Vec<SceneStep>,
    end: Vec<SceneStep>,
) -> Result<TransitionRequest, elgato_lights_rs::Error> {
    Ok(TransitionRequest::from_steps(steps)?.with_end(EndState::from_steps(
        end,
        EndState::DEFAULT_NAME,
        EndState::DEFAULT_ID,
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let client = config.http.client()?;

    match cli.command {
        Commands::Discover { addresses } => {
            println!("Probing {} address(es)...", addresses.len());
            let discovery = ManualDiscovery::new(addresses, client).with_config(&config.discovery);
            let found = discovery
                .discover(&config.discovery.service_type, config.discovery.timeout)
                .await?;
            if found.is_empty() {
                println!("No lights answered.");
            }
            for (product, lights) in found {
                println!("{product}:");
                for light in lights {
                    println!("  {}", light.address());
                }
            }
        }

        Commands::Room { lights, steps, end } => {
            let discovery = Arc::new(ManualDiscovery::new(lights, client).with_config(&config.discovery));
            let mut room = Room::with_discovery("cli", discovery, &config);
            if !room.setup(Some(config.discovery.timeout)).await? {
                println!("No lights answered.");
                return Ok(());
            }

            println!("Running transition on {} light(s)...", room.len());
            let report = room.apply_transition(&request(steps, end)?).await?;
            for device in report.devices() {
                println!("  {}: {:?}", device.address(), device.outcome());
            }
        }

        command => {
            // All other commands require an IP address
            let ip = cli
                .ip
                .ok_or("IP address is required for this command. Use --ip <IP>")?;
            let address = SocketAddrV4::new(ip, cli.port);
            let mut light = Light::connect(address, None, client).await?;

            match command {
                Commands::Discover { .. } | Commands::Room { .. } => unreachable!(),

                Commands::Info => {
                    if let Some(info) = light.accessory_info() {
                        println!("{}", serde_json::to_string_pretty(info)?);
                    }
                    println!("Kind: {}", light.kind());
                }

                Commands::Status => {
                    let state = light.read_state().await?;
                    println!("{}", serde_json::to_string_pretty(&state)?);
                }

                Commands::On => light.set_color(Power::On, Color::white(100.0)).await?,

                Commands::Off => light.set_color(Power::Off, Color::off()).await?,

                Commands::Color { color } => {
                    let power = Power::from_brightness(color.brightness());
                    light.set_color(power, color).await?;
                }

                Commands::Scene { steps, name } => {
                    let scene = Scene::from_steps(steps);
                    light.set_scene(&scene, &name, &format!("{name}-id")).await?;
                }

                Commands::Transition { steps, end } => {
                    let mut room = Room::new("cli");
                    room.new_light(Box::new(light))?;
                    let report = room.apply_transition_to_one(ip, &request(steps, end)?).await?;
                    println!("{}: {:?}", address, report.outcome_of(address));
                }

                Commands::Settings => {
                    let settings = light.settings().await?;
                    println!("{}", serde_json::to_string_pretty(&settings)?);
                }

                Commands::Diagnostics => {
                    println!("{}", serde_json::to_string_pretty(&light.diagnostics().await)?);
                }
            }
        }
    }

    Ok(())
}
