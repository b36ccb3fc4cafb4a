//! Command-line provisioning for the Smart Flashcard.

use anyhow::Context;
use clap::{Parser, Subcommand};
use flashcard_provision::domain::auth::{FixedTokenProvider, TokenProvider};
use flashcard_provision::domain::models::WifiCredentials;
use flashcard_provision::domain::settings::SettingsService;
use flashcard_provision::error::PairingError;
use flashcard_provision::infrastructure::logging;
use flashcard_provision::infrastructure::transport::{BtleplugTransport, Transport};
use flashcard_provision::SessionController;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "flashcard-provision")]
#[command(about = "Provision a Smart Flashcard over BLE")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair with the device and store Wi-Fi credentials plus an account token
    Provision {
        /// Network name to store on the device
        #[arg(long)]
        ssid: String,
        /// Network password
        #[arg(long)]
        password: String,
        /// Account token the device will present to the backend
        #[arg(long)]
        token: String,
        /// How long to scan for the device, in seconds
        #[arg(long, default_value = "10")]
        scan_seconds: u64,
    },
    /// Print the path of the settings file
    ConfigPath,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings_service = SettingsService::new()?;
    let _logging_guard = logging::init(&settings_service.get().log_settings)?;

    match cli.command {
        Commands::Provision {
            ssid,
            password,
            token,
            scan_seconds,
        } => provision(&settings_service, ssid, password, token, scan_seconds).await,
        Commands::ConfigPath => {
            println!("{}", settings_service.path().display());
            Ok(())
        }
    }
}

async fn provision(
    settings: &SettingsService,
    ssid: String,
    password: String,
    token: String,
    scan_seconds: u64,
) -> anyhow::Result<()> {
    let descriptor = settings.get().descriptor()?;
    let characteristics = settings.get().characteristic_map()?;

    let transport = BtleplugTransport::new()
        .await
        .context("could not reach the BLE stack")?
        .with_scan_window(Duration::from_secs(scan_seconds));

    let mut controller = SessionController::new(
        transport,
        descriptor,
        characteristics,
        FixedTokenProvider::new(token),
    );

    let credentials = WifiCredentials { ssid, password };
    let outcome = pair_and_configure(&mut controller, &credentials).await;
    flush_status(&mut controller);
    outcome.map_err(Into::into)
}

async fn pair_and_configure<T: Transport, P: TokenProvider>(
    controller: &mut SessionController<T, P>,
    credentials: &WifiCredentials,
) -> Result<(), PairingError> {
    controller.connect().await?;
    flush_status(controller);

    if let Err(error) = controller.submit_configuration(credentials).await {
        if controller.is_connected() {
            let _ = controller.disconnect().await;
        }
        return Err(error);
    }

    controller.disconnect().await
}

fn flush_status<T: Transport, P: TokenProvider>(controller: &mut SessionController<T, P>) {
    for event in controller.poll_events() {
        println!(
            "{} [{}] {}",
            event.timestamp_display(),
            event.severity,
            event.message
        );
    }
}
