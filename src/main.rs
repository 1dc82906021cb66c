use anyhow::Context;
use routerkit::{
    ensure_directories, Config, FileStore, MachineController, NoopSpindle, NoopVacuum,
    SpindleSink, StateBroadcaster, ToolStore, VacuumSink,
};
use std::sync::Arc;
use std::time::Duration;

/// How often the daemon asks an attached controller for a status frame
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    routerkit::init_logging()?;
    tracing::info!("routerkit {} (built {})", routerkit::VERSION, routerkit::BUILD_DATE);

    let config = Config::from_env();
    ensure_directories(&config).context("creating data directories")?;

    let files = Arc::new(FileStore::new(config.gcode_dir()).context("opening file store")?);
    let tools = Arc::new(ToolStore::open(config.db_path()).context("opening tool store")?);
    let (spindle, vacuum) = build_sinks(&config);
    let controller = MachineController::new(&config, files, tools, spindle, vacuum);

    if config.simulation {
        tracing::info!("simulation mode: no motion controller attached");
    } else {
        controller.connect();
    }

    let broadcaster = Arc::new(StateBroadcaster::new());
    let feed = {
        let controller = controller.clone();
        broadcaster.clone().spawn(move || controller.snapshot())
    };

    // Keep status frames flowing while a controller is attached; each reply
    // lands in the state through the link's ingress worker.
    let poll = {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                if controller.is_connected() {
                    controller.request_status();
                }
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    feed.abort();
    poll.abort();
    Ok(())
}

/// Open the hardware sinks, degrading to no-ops when they are unavailable
fn build_sinks(config: &Config) -> (Arc<dyn SpindleSink>, Arc<dyn VacuumSink>) {
    #[cfg(feature = "hardware")]
    {
        use routerkit_machine::{VacuumRelay, VfdOutput};

        let spindle: Arc<dyn SpindleSink> = match VfdOutput::new(config) {
            Ok(vfd) => Arc::new(vfd),
            Err(e) => {
                tracing::warn!("{}; spindle outputs disabled", e);
                Arc::new(NoopSpindle)
            }
        };
        let vacuum: Arc<dyn VacuumSink> = match VacuumRelay::new(config) {
            Ok(relay) => Arc::new(relay),
            Err(e) => {
                tracing::warn!("{}; vacuum relay disabled", e);
                Arc::new(NoopVacuum)
            }
        };
        (spindle, vacuum)
    }

    #[cfg(not(feature = "hardware"))]
    {
        let _ = config;
        (Arc::new(NoopSpindle), Arc::new(NoopVacuum))
    }
}
