//! Engine bootstrap shared by the CLI and the integration tests.
//!
//! [`Engine`] wires a store, the payment gateway and the application
//! services together from an [`AppConfig`].

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::application::{BookingService, SlotMaintenanceService};
use crate::config::AppConfig;
use crate::domain::{FeeCalculator, PaymentProcessor, RepositoryProvider};
use crate::infrastructure::{
    init_database, run_migrations, InMemoryStorage, SeaOrmRepositoryProvider,
    SimulatedPaymentProcessor,
};
use crate::shared::errors::{AppError, InfraError};

// ── Options ────────────────────────────────────────────────────────

/// Where bookings live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// SQL database from `[database]`
    #[default]
    Database,
    /// Process-local tables, lost on exit
    Memory,
}

pub struct EngineOptions {
    pub config: AppConfig,
    pub store: StoreKind,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            store: StoreKind::default(),
            auto_migrate: true,
        }
    }
}

// ── Engine ─────────────────────────────────────────────────────────

/// A ready-to-use booking engine.
///
/// ```rust,no_run
/// use parking_engine::runtime::{Engine, EngineOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = Engine::start(EngineOptions::default()).await?;
///     let active = engine.bookings.active_bookings().await?;
///     println!("{} active bookings", active.len());
///     engine.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Engine {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    pub bookings: Arc<BookingService>,
    pub slots: Arc<SlotMaintenanceService>,
    /// The configuration the engine was started with.
    pub config: AppConfig,

    db: Option<DatabaseConnection>,
}

impl Engine {
    pub async fn start(opts: EngineOptions) -> Result<Self, AppError> {
        let config = opts.config;
        config.validate()?;

        let (repos, db): (Arc<dyn RepositoryProvider>, _) = match opts.store {
            StoreKind::Memory => {
                info!("Using in-memory store");
                (Arc::new(InMemoryStorage::new()), None)
            }
            StoreKind::Database => {
                let db = init_database(&config.database)
                    .await
                    .map_err(InfraError::from)?;
                if opts.auto_migrate {
                    run_migrations(&db).await.map_err(InfraError::from)?;
                }
                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            }
        };

        let payments = payment_processor(&config);
        Self::assemble(config, repos, payments, db)
    }

    /// Engine over an explicit store and gateway.
    pub fn with_parts(
        config: AppConfig,
        repos: Arc<dyn RepositoryProvider>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Result<Self, AppError> {
        Self::assemble(config, repos, payments, None)
    }

    fn assemble(
        config: AppConfig,
        repos: Arc<dyn RepositoryProvider>,
        payments: Arc<dyn PaymentProcessor>,
        db: Option<DatabaseConnection>,
    ) -> Result<Self, AppError> {
        let fees = FeeCalculator::new(config.pricing.to_table()?);
        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            payments,
            fees,
            config.booking_settings(),
        ));
        let slots = Arc::new(SlotMaintenanceService::new(repos.clone()));

        info!(
            default_rate = %config.pricing.default_rate,
            window_minutes = config.booking.default_window_minutes,
            "🅿️ Booking engine ready"
        );
        Ok(Self {
            repos,
            bookings,
            slots,
            config,
            db,
        })
    }

    /// Close the database pool, if any.
    pub async fn shutdown(self) {
        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!(error = %e, "Error closing database connection");
            }
        }
        info!("Booking engine stopped");
    }
}

fn payment_processor(config: &AppConfig) -> Arc<dyn PaymentProcessor> {
    let p = config.payment.success_probability;
    match config.payment.seed {
        Some(seed) => Arc::new(SimulatedPaymentProcessor::seeded(p, seed)),
        None => Arc::new(SimulatedPaymentProcessor::new(p)),
    }
}

// ── Observability ──────────────────────────────────────────────────

/// Install the Prometheus recorder once per process.
///
/// Returns `None` when another recorder is already installed.
pub fn install_metrics_recorder() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder not installed");
                None
            }
        })
        .clone()
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup. `RUST_LOG` overrides `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
