//! # NovAtel Link
//!
//! GPS subsystem runner: opens the receiver's serial port, starts the
//! receive worker, and republishes navigation state until interrupted.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load configuration (path from the first argument, defaults otherwise)
//!    - Open and configure the GPS serial port (fatal on failure)
//!
//! 2. **Main Loop**
//!    - The receive worker synchronizes, validates, and decodes telemetry
//!    - Status is logged as navigation updates arrive
//!    - Ctrl+C requests a graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - The worker stops receiver telemetry (UNLOG) and exits
//!
//! # Errors
//!
//! Returns error if:
//! - The serial port cannot be opened or configured
//! - The configuration file is invalid

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use novatel_link::config::Config;
use novatel_link::receiver::GpsReceiver;
use novatel_link::serial::GpsSerial;
use novatel_link::sink::{NavigationSink, SharedNavState, ShutdownFlag, TimeAuthority};
use novatel_link::telemetry::SampleLogger;

/// Navigation updates between status log lines (~10 s at the nominal 4 Hz)
const STATUS_LOG_INTERVAL_UPDATES: u64 = 40;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("NovAtel link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let nav_state = SharedNavState::new();
    let shutdown = ShutdownFlag::new();

    let logger = if config.persistence.enabled {
        Some(SampleLogger::create(
            &config.persistence.log_dir,
            config.persistence.max_records_per_file,
            config.persistence.max_files_to_keep,
        )?)
    } else {
        None
    };

    // transport open/config failures are fatal to the whole application
    let serial = GpsSerial::open(&config.serial.port, config.serial.baud_rate)?;

    let nav: Arc<dyn NavigationSink> = nav_state.clone();
    let time: Arc<dyn TimeAuthority> = nav_state.clone();
    let receiver = GpsReceiver::new(
        serial,
        config.receiver.clone(),
        nav,
        time,
        logger,
        shutdown.clone(),
    );
    let worker = tokio::spawn(receiver.run());

    info!("Press Ctrl+C to exit");

    let mut updates = nav_state.subscribe();
    loop {
        tokio::select! {
            // Surface navigation progress without spamming the log
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = *updates.borrow_and_update();
                if count % STATUS_LOG_INTERVAL_UPDATES == 0 {
                    let snapshot = nav_state.snapshot();
                    if let Some(llh) = snapshot.llh_position {
                        info!(
                            "Update {}: lat {:.6} rad, lon {:.6} rad, height {:.1} m, {} sats",
                            count,
                            llh[0],
                            llh[1],
                            llh[2],
                            snapshot.num_sats.unwrap_or(0)
                        );
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                shutdown.request_shutdown();
                break;
            }
        }
    }

    worker.await??;
    info!("NovAtel link stopped");

    Ok(())
}
