//! # Inventory Desktop Library
//!
//! Composition root of the inventory desktop app. Widgets live in the UI
//! shell; this crate wires the pieces they talk through.
//!
//! ## Module Organization
//! ```text
//! inventory_desktop_lib/
//! ├── lib.rs          ◄─── You are here (startup, shutdown)
//! ├── bridge.rs       ◄─── JSON entry points for widgets
//! ├── catalog.rs      ◄─── Product lookup seeded from a JSON file
//! └── error.rs        ◄─── API error type for bridge calls
//! ```
//!
//! ## Threading
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Desktop Threading Model                              │
//! │                                                                         │
//! │  widgets / workers (any thread)                                        │
//! │        │ bridge::publish_from_widget                                    │
//! │        ▼                                                                │
//! │  EventBus::global() ──► HostLoopHandle ──► bounded queue               │
//! │                                                │                        │
//! │                                                ▼                        │
//! │  host loop task (one thread at a time) ──► listeners + Mediator        │
//! │                                                                         │
//! │  Ctrl-C ──► Coordination::shutdown ──► mediator cleanup, unbind loop   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod catalog;
pub mod error;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use inventory_events::{CoordinationConfig, EventBus, HostLoop, InMemoryCatalog, Mediator};

use crate::catalog::{catalog_path_from_env, load_catalog};
use crate::error::ApiError;

/// Everything that must stay alive while the app runs.
pub struct Coordination {
    pub bus: EventBus,
    pub mediator: Mediator,
    pub catalog: Option<Arc<InMemoryCatalog>>,
}

impl Coordination {
    /// Binds `bus` to a new host loop and registers the mediator on it.
    ///
    /// The returned [`HostLoop`] must be driven by the thread that owns the
    /// widgets. With a catalog the mediator refreshes every added product
    /// from it.
    pub fn start(
        bus: EventBus,
        config: &CoordinationConfig,
        catalog: Option<InMemoryCatalog>,
    ) -> Result<(Coordination, HostLoop), ApiError> {
        config.validate()?;

        let (host, handle) = HostLoop::new(config.bus.queue_capacity);
        bus.bind_host_loop(handle);

        let catalog = catalog.map(Arc::new);
        let mut builder = Mediator::builder(bus.clone()).settings(config.mediator.clone());
        if let Some(catalog) = &catalog {
            builder = builder.lookup(catalog.clone());
        }

        let mediator = match builder.build() {
            Ok(mediator) => mediator,
            Err(e) => {
                bus.unbind_host_loop();
                return Err(e.into());
            }
        };

        info!(
            queue_capacity = host.capacity(),
            catalog = catalog.as_ref().map_or(0, |c| c.len()),
            "Coordination started"
        );

        Ok((
            Coordination {
                bus,
                mediator,
                catalog,
            },
            host,
        ))
    }

    /// Unregisters the mediator and releases the host loop.
    pub fn shutdown(self) {
        self.mediator.cleanup();
        self.bus.unbind_host_loop();
        info!(stats = ?self.bus.stats(), "Coordination stopped");
    }
}

/// Runs the desktop app until Ctrl-C.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │     • Default: INFO, inventory crates at DEBUG; override with RUST_LOG  │
/// │                                                                         │
/// │  2. Load Config ──────────────────────────────────────────────────────► │
/// │     • coordination.toml in the platform config dir, then env overrides  │
/// │     • Falls back to defaults on any error                               │
/// │                                                                         │
/// │  3. Seed Catalog (optional) ──────────────────────────────────────────► │
/// │     • INVENTORY_CATALOG_PATH                                            │
/// │                                                                         │
/// │  4. Start Coordination ───────────────────────────────────────────────► │
/// │     • Global bus bound to a fresh host loop                             │
/// │     • Mediator registered                                               │
/// │                                                                         │
/// │  5. Drive Host Loop until Ctrl-C, then shut down                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn run() {
    init_tracing();

    info!("Starting Inventory Desktop Application");

    let config = CoordinationConfig::load_or_default(None);

    let catalog = catalog_path_from_env().and_then(|path| match load_catalog(&path) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!(?path, error = %e, "Could not seed catalog, continuing without lookup");
            None
        }
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let (coordination, host) = match Coordination::start(EventBus::global(), &config, catalog)
        {
            Ok(started) => started,
            Err(e) => {
                error!(error = %e, "Failed to start coordination");
                return;
            }
        };

        tokio::select! {
            _ = host.run() => {
                warn!("Host loop ended before shutdown");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutdown requested");
            }
        }

        coordination.shutdown();
    });
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=inventory_events=trace` - Show trace for the bus only
/// - Default: INFO, DEBUG for inventory crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,inventory_core=debug,inventory_events=debug,inventory_desktop_lib=debug")
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
