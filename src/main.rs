//! Parking Engine CLI
//!
//! Operates the booking engine against the configured database and prints
//! results as JSON.
//!
//! ```sh
//! # Create the schema
//! parking-engine migrate
//!
//! # Add a slot and a driver, then park
//! parking-engine slot add --number A-1 --slot-type CAR
//! parking-engine user add --email driver@example.com --name Driver --vehicle-type CAR
//! parking-engine reserve --slot 1 --user 1
//! parking-engine checkout 1
//! parking-engine pay 1 --principal driver@example.com --amount 2
//!
//! # Concurrency demo against an in-memory store
//! parking-engine simulate --slots 3 --drivers 20
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use parking_engine::application::ReserveRequest;
use parking_engine::config::{default_config_path, AppConfig};
use parking_engine::domain::{DomainError, NewSlot, NewUser, NewVehicle, VehicleType};
use parking_engine::runtime::{
    init_tracing, install_metrics_recorder, Engine, EngineOptions, StoreKind,
};
use parking_engine::shared::errors::{AppError, InfraError};

/// Parking slot reservation and booking engine.
#[derive(Parser, Debug)]
#[command(
    name = "parking-engine",
    version,
    about = "Parking slot reservation and booking lifecycle engine",
    long_about = "Reserve parking slots, check out, pay and repair bookings.\n\n\
                  Default config: ~/.config/parking-engine/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PARKING_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply database migrations and exit.
    Migrate,
    /// Validate the configuration file and print the effective settings.
    Check,
    /// Manage slots.
    #[command(subcommand)]
    Slot(SlotCommand),
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage registered vehicles.
    #[command(subcommand)]
    Vehicle(VehicleCommand),
    /// Reserve a slot.
    Reserve(ReserveArgs),
    /// Check out a booking and quote the fee.
    Checkout { booking_id: i64 },
    /// Pay for a checked-out booking.
    Pay(PayArgs),
    /// Cancel a booking.
    Cancel { booking_id: i64 },
    /// Return an ACTIVE booking with an exit time to pre-checkout state.
    Repair { booking_id: i64 },
    /// Show one booking.
    Show { booking_id: i64 },
    /// List bookings (active ones by default).
    Bookings(BookingsArgs),
    /// Paid bookings of a user.
    History {
        #[arg(long)]
        principal: String,
    },
    /// Run concurrent drivers against an in-memory engine and print metrics.
    Simulate(SimulateArgs),
}

#[derive(Subcommand, Debug)]
enum SlotCommand {
    Add {
        #[arg(long)]
        number: String,
        #[arg(long)]
        slot_type: Option<String>,
        #[arg(long)]
        location: Option<i64>,
    },
    List {
        /// Only slots that can be reserved right now
        #[arg(long)]
        available: bool,
        #[arg(long)]
        location: Option<i64>,
    },
    Disable {
        slot_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    Enable { slot_id: i64 },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        vehicle_type: Option<VehicleType>,
    },
}

#[derive(Subcommand, Debug)]
enum VehicleCommand {
    Add {
        #[arg(long)]
        user_id: i64,
        #[arg(long = "type")]
        vehicle_type: VehicleType,
        #[arg(long)]
        plate: Option<String>,
        #[arg(long)]
        default: bool,
    },
}

#[derive(Args, Debug)]
struct ReserveArgs {
    #[arg(long)]
    slot: i64,
    #[arg(long)]
    user: Option<i64>,
    #[arg(long)]
    vehicle_type: Option<VehicleType>,
    /// RFC 3339 entry time (default: now)
    #[arg(long)]
    entry: Option<DateTime<Utc>>,
    /// RFC 3339 exit time
    #[arg(long)]
    exit: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct PayArgs {
    booking_id: i64,
    /// E-mail of the paying user
    #[arg(long)]
    principal: String,
    #[arg(long)]
    amount: Option<Decimal>,
    #[arg(long, default_value = "CARD")]
    method: String,
}

#[derive(Args, Debug)]
struct BookingsArgs {
    #[arg(long, conflicts_with = "slot")]
    user: Option<i64>,
    #[arg(long)]
    slot: Option<i64>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[arg(long, default_value_t = 3)]
    slots: usize,
    #[arg(long, default_value_t = 20)]
    drivers: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = match &e {
                AppError::Domain(d) => d.kind(),
                AppError::Infra(_) => "internal",
                AppError::Config(_) => "config",
            };
            if matches!(&e, AppError::Domain(d) if !d.is_internal()) {
                info!(kind, "Request rejected");
            } else {
                error!(error = %e, "Command failed");
            }
            eprintln!("{}", json!({ "error": kind, "message": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    match command {
        Command::Check => {
            config.validate()?;
            print_json(&config)
        }
        Command::Simulate(args) => simulate(config, args).await,
        command => {
            let engine = Engine::start(EngineOptions {
                config,
                store: StoreKind::Database,
                auto_migrate: true,
            })
            .await?;
            let result = execute(&engine, command).await;
            engine.shutdown().await;
            result
        }
    }
}

async fn execute(engine: &Engine, command: Command) -> Result<(), AppError> {
    let bookings = &engine.bookings;
    match command {
        Command::Migrate => print_json(&json!({ "migrated": true })),
        Command::Slot(cmd) => match cmd {
            SlotCommand::Add {
                number,
                slot_type,
                location,
            } => {
                let slot = engine
                    .slots
                    .add_slot(NewSlot {
                        number,
                        slot_type,
                        location_id: location,
                    })
                    .await?;
                print_json(&slot)
            }
            SlotCommand::List {
                available,
                location,
            } => print_json(&engine.slots.list_slots(available, location).await?),
            SlotCommand::Disable { slot_id, notes } => {
                print_json(&engine.slots.disable_slot(slot_id, notes, None).await?)
            }
            SlotCommand::Enable { slot_id } => {
                print_json(&engine.slots.enable_slot(slot_id, None).await?)
            }
        },
        Command::User(UserCommand::Add {
            email,
            name,
            vehicle_type,
        }) => {
            let user = engine
                .repos
                .users()
                .create(NewUser {
                    email,
                    name,
                    vehicle_type,
                })
                .await?;
            print_json(&user)
        }
        Command::Vehicle(VehicleCommand::Add {
            user_id,
            vehicle_type,
            plate,
            default,
        }) => {
            let vehicle = engine
                .repos
                .users()
                .add_vehicle(NewVehicle {
                    user_id,
                    vehicle_type,
                    plate,
                    is_default: default,
                })
                .await?;
            print_json(&vehicle)
        }
        Command::Reserve(args) => {
            let request = ReserveRequest {
                user_id: args.user,
                slot_id: args.slot,
                vehicle_type: args.vehicle_type,
                entry_time: Some(args.entry.unwrap_or_else(Utc::now)),
                exit_time: args.exit,
            };
            print_json(&bookings.reserve(request).await?)
        }
        Command::Checkout { booking_id } => print_json(&bookings.checkout(booking_id).await?),
        Command::Pay(args) => {
            let confirmation = bookings
                .confirm_payment(args.booking_id, &args.principal, args.amount, &args.method)
                .await?;
            print_json(&confirmation)
        }
        Command::Cancel { booking_id } => print_json(&bookings.cancel(booking_id).await?),
        Command::Repair { booking_id } => {
            print_json(&bookings.repair_stranded_booking(booking_id).await?)
        }
        Command::Show { booking_id } => print_json(&bookings.get_booking(booking_id).await?),
        Command::Bookings(args) => {
            let list = match (args.user, args.slot) {
                (Some(user_id), _) => bookings.list_bookings(user_id).await?,
                (None, Some(slot_id)) => bookings.bookings_for_slot(slot_id).await?,
                (None, None) => bookings.active_bookings().await?,
            };
            print_json(&list)
        }
        Command::History { principal } => print_json(&bookings.payment_history(&principal).await?),
        Command::Check | Command::Simulate(_) => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value).map_err(InfraError::from)?;
    println!("{out}");
    Ok(())
}

// ── simulate ───────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
struct SimulationReport {
    drivers: usize,
    slots: usize,
    reserved: usize,
    rejected: usize,
    paid: usize,
    declined: usize,
}

/// Many drivers race for a few slots; winners park, check out and pay.
async fn simulate(config: AppConfig, args: SimulateArgs) -> Result<(), AppError> {
    let prometheus = install_metrics_recorder();

    let engine = Engine::start(EngineOptions {
        config,
        store: StoreKind::Memory,
        auto_migrate: false,
    })
    .await?;

    let mut slot_ids = Vec::with_capacity(args.slots);
    for n in 0..args.slots {
        let slot = engine
            .slots
            .add_slot(NewSlot {
                number: format!("SIM-{}", n + 1),
                slot_type: None,
                location_id: None,
            })
            .await?;
        slot_ids.push(slot.id);
    }

    let mut drivers = Vec::with_capacity(args.drivers);
    for n in 0..args.drivers {
        let email = format!("driver{}@sim.local", n + 1);
        let user = engine
            .repos
            .users()
            .create(NewUser {
                email: email.clone(),
                name: format!("Driver {}", n + 1),
                vehicle_type: Some(VehicleType::Car),
            })
            .await?;
        let slot_id = slot_ids.choose(&mut rand::thread_rng()).copied();
        drivers.push((user.id, email, slot_id));
    }

    info!(drivers = args.drivers, slots = args.slots, "🚗 Simulation started");

    let mut handles = Vec::with_capacity(drivers.len());
    for (user_id, email, slot_id) in drivers {
        let bookings = Arc::clone(&engine.bookings);
        handles.push(tokio::spawn(async move {
            let Some(slot_id) = slot_id else {
                return Err(DomainError::InvalidInput("no slots to reserve".into()));
            };
            let entry = Utc::now() - Duration::minutes(75);
            let booking = bookings
                .reserve(ReserveRequest::now(Some(user_id), slot_id).window(entry, None))
                .await?;
            let quote = bookings.checkout(booking.id).await?;
            bookings
                .confirm_payment(booking.id, &email, Some(quote.fee), "CARD")
                .await
                .map(|_| ())
        }));
    }

    let mut report = SimulationReport {
        drivers: args.drivers,
        slots: args.slots,
        ..SimulationReport::default()
    };
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {
                report.reserved += 1;
                report.paid += 1;
            }
            Ok(Err(DomainError::PaymentDeclined(_))) => {
                report.reserved += 1;
                report.declined += 1;
            }
            Ok(Err(_)) => report.rejected += 1,
            Err(e) => error!(error = %e, "Simulated driver task failed"),
        }
    }

    print_json(&report)?;
    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }
    engine.shutdown().await;
    Ok(())
}
