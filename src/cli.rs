//! CLI interface for Mowdeck.
//!
//! Each subcommand is non-interactive: arguments in, output out. Command
//! results go to stdout; status lines go to stderr.
//!
//! Commands split into three groups:
//!
//! - `mowdeck service|operation|mth|queue|sync`: the offline write path.
//!   Writes go to the remote store when it is reachable and are queued
//!   locally otherwise. `--offline` forces queuing.
//! - `mowdeck route optimize|plan`: route planning over a JSON list of sites.
//! - `mowdeck notifications|sun-glare`: device-local preferences.

mod format;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::model::{QueuedWrite, ServiceDone, ServiceInterval, Waypoint, WriteOp};
use crate::remote::{PostgrestStore, RemoteStore, Unconfigured};
use crate::route::{OsrmBackend, RoutingClient, optimize_order, plan_route};
use crate::service::due_notifications;
use crate::storage::Storage;
use crate::sync::{Submission, SyncEngine};

use format::{
    format_drain_report, format_mth, format_notification, format_plan_summary, format_write,
    short_id,
};

/// Timeout for calls to the remote store.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

type Engine = SyncEngine<Storage, Box<dyn RemoteStore>>;

/// Mowdeck: field companion for a mowing machine.
#[derive(Debug, Parser)]
#[command(name = "mowdeck", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Treat the device as offline: queue writes instead of sending them.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: a day in the field
  1. mowdeck --offline mth set 1250.5
     → prints the queued write ID
  2. mowdeck --offline service add '{"servisni_interval_id":"oil","mth_pri_servisu":1250.5}'
  3. mowdeck queue list
  4. mowdeck sync
     → replays queued writes, oldest first

Routes:
  mowdeck route plan sites.json --optimize
  mowdeck route optimize sites.json > ordered.json"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a completed service.
    Service {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Record a day's operation.
    Operation {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Read or update the machine's motor-hours.
    Mth {
        #[command(subcommand)]
        command: MthCommand,
    },

    /// Inspect and manage writes waiting to sync.
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Replay queued writes against the remote store.
    ///
    /// Writes are sent one at a time, oldest first. A write that keeps
    /// failing is moved to the failed list (see `queue failed`).
    Sync,

    /// Plan routes between mowing sites.
    Route {
        #[command(subcommand)]
        command: RouteCommand,
    },

    /// Show service reminders, or dismiss one.
    ///
    /// Reads a JSON file with `intervals` and `services` and prints the
    /// reminders due at the machine's current motor-hours.
    #[command(args_conflicts_with_subcommands = true)]
    Notifications {
        /// Service schedule JSON: `{ "intervals": [...], "services": [...] }`.
        file: Option<PathBuf>,

        #[command(subcommand)]
        command: Option<NotificationsCommand>,
    },

    /// Show or set the high-contrast display preference.
    SunGlare {
        state: Option<Toggle>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Submit a record. Prints the queue ID if the write was deferred.
    Add {
        /// Record row as a JSON object.
        json: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum MthCommand {
    /// Submit a new reading. It may not be below the current value.
    Set { value: f64 },

    /// Show the confirmed value and any reading still waiting to sync.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List writes waiting to sync, oldest first.
    List,

    /// List writes that ran out of retries or became invalid.
    Failed,

    /// Put a failed write back in the queue with a fresh retry budget.
    Retry {
        /// Write ID: full UUID or unambiguous prefix.
        id: String,
    },

    /// Drop a failed write for good.
    Discard {
        /// Write ID: full UUID or unambiguous prefix.
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RouteCommand {
    /// Reorder sites into a short tour. Prints the ordered JSON.
    Optimize {
        /// JSON array of sites.
        file: PathBuf,
    },

    /// Plan a route through sites in order. Prints the plan JSON.
    Plan {
        /// JSON array of sites.
        file: PathBuf,

        /// Reorder the sites before planning.
        #[arg(long)]
        optimize: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// Hide a reminder until the next service of its interval.
    Dismiss { key: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Input for `notifications`.
#[derive(Debug, Deserialize)]
struct ServiceSchedule {
    intervals: Vec<ServiceInterval>,

    #[serde(default)]
    services: Vec<ServiceDone>,
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config, storage: &Storage) -> Result<(), String> {
    let cli = Cli::parse();
    let offline = cli.offline;

    match cli.command {
        Command::Service {
            command: RecordCommand::Add { json },
        } => with_engine(config, storage, offline, |engine| {
            cmd_submit(engine, WriteOp::ServiceRecord(parse_row(&json)?))
        }),
        Command::Operation {
            command: RecordCommand::Add { json },
        } => with_engine(config, storage, offline, |engine| {
            cmd_submit(engine, WriteOp::OperationRecord(parse_row(&json)?))
        }),
        Command::Mth { command } => with_engine(config, storage, offline, |engine| match command {
            MthCommand::Set { value } => cmd_mth_set(config, engine, value),
            MthCommand::Show => cmd_mth_show(engine),
        }),
        Command::Queue { command } => with_engine(config, storage, offline, |engine| {
            cmd_queue(engine, &command)
        }),
        Command::Sync => {
            if offline {
                return Err("cannot sync while --offline".to_string());
            }
            if config.remote.is_none() {
                return Err(
                    "no [remote] section in config; writes stay queued until one is added"
                        .to_string(),
                );
            }
            with_engine(config, storage, offline, cmd_sync)
        }
        Command::Route { command } => cmd_route(config, &command),
        Command::Notifications {
            command: Some(NotificationsCommand::Dismiss { key }),
            ..
        } => cmd_dismiss(storage, &key),
        Command::Notifications { file, command: None } => {
            let file = file.ok_or("specify a service schedule file, or `dismiss <key>`")?;
            cmd_notifications(config, storage, &file)
        }
        Command::SunGlare { state } => cmd_sun_glare(storage, state),
    }
}

/// Builds the sync engine, runs `f`, and persists the machine state the
/// remote confirmed along the way.
fn with_engine(
    config: &Config,
    storage: &Storage,
    offline: bool,
    f: impl FnOnce(&Engine) -> Result<(), String>,
) -> Result<(), String> {
    let machine = storage
        .load_machine_state(&config.machine_id)
        .map_err(|e| format!("failed to load machine state: {e}"))?;
    let engine = SyncEngine::new(storage.clone(), remote_store(config)?, machine);
    engine.on_depth_change(|depth| debug!(depth = *depth, "write queue depth changed"));
    engine.on_drain_complete(|report| eprintln!("{}", format_drain_report(report)));
    if offline || config.remote.is_none() {
        engine.set_online(false);
    }

    let result = f(&engine);

    storage
        .save_machine_state(&engine.machine_state())
        .map_err(|e| format!("failed to save machine state: {e}"))?;
    result
}

fn remote_store(config: &Config) -> Result<Box<dyn RemoteStore>, String> {
    let Some(remote) = &config.remote else {
        return Ok(Box::new(Unconfigured));
    };
    let store = PostgrestStore::new(&remote.url, &remote.api_key, REMOTE_TIMEOUT)
        .map_err(|e| format!("failed to set up remote store: {e}"))?;
    Ok(Box::new(store))
}

fn cmd_submit(engine: &Engine, op: WriteOp) -> Result<(), String> {
    let submission = engine.submit_write(op).map_err(|e| e.to_string())?;
    report_submission(engine, submission);
    Ok(())
}

fn cmd_mth_set(config: &Config, engine: &Engine, value: f64) -> Result<(), String> {
    let submission = engine
        .submit_motor_hours_update(&config.machine_id, value)
        .map_err(|e| e.to_string())?;
    report_submission(engine, submission);
    Ok(())
}

fn report_submission(engine: &Engine, submission: Submission) {
    match submission {
        Submission::Applied => eprintln!("Saved"),
        Submission::Queued(id) => {
            println!("{id}");
            eprintln!(
                "Saved locally, {} write(s) waiting to sync",
                engine.pending_count()
            );
        }
    }
}

fn cmd_mth_show(engine: &Engine) -> Result<(), String> {
    let machine = engine.machine_state();
    let known = engine
        .current_motor_hours()
        .map_err(|e| format!("failed to read write queue: {e}"))?;

    let updated = machine
        .updated_at
        .map_or_else(|| "never".to_string(), |t| t.to_string());
    println!(
        "{}  {} mth  (updated {updated})",
        machine.machine_id,
        format_mth(machine.motor_hours)
    );
    if known > machine.motor_hours {
        println!("pending  {} mth", format_mth(known));
    }
    Ok(())
}

fn cmd_queue(engine: &Engine, command: &QueueCommand) -> Result<(), String> {
    match command {
        QueueCommand::List => {
            let items = engine
                .pending_items()
                .map_err(|e| format!("failed to read write queue: {e}"))?;
            print_writes(&items, "No writes waiting to sync");
            Ok(())
        }
        QueueCommand::Failed => {
            let items = engine
                .failed_items()
                .map_err(|e| format!("failed to read failed writes: {e}"))?;
            print_writes(&items, "No failed writes");
            Ok(())
        }
        QueueCommand::Retry { id } => {
            let item = resolve_failed(engine, id)?;
            engine
                .retry_failed(item.id)
                .map_err(|e| format!("failed to requeue write: {e}"))?;
            eprintln!("Write {} queued again", short_id(item.id));
            Ok(())
        }
        QueueCommand::Discard { id } => {
            let item = resolve_failed(engine, id)?;
            engine
                .discard_failed(item.id)
                .map_err(|e| format!("failed to discard write: {e}"))?;
            eprintln!("Write {} discarded", short_id(item.id));
            Ok(())
        }
    }
}

fn print_writes(items: &[QueuedWrite], empty: &str) {
    if items.is_empty() {
        println!("{empty}");
        return;
    }
    for item in items {
        println!("{}", format_write(item));
    }
}

fn cmd_sync(engine: &Engine) -> Result<(), String> {
    engine.drain_queue();

    let failed = engine
        .failed_items()
        .map_err(|e| format!("failed to read failed writes: {e}"))?;
    if !failed.is_empty() {
        eprintln!(
            "{} write(s) in the failed list; see `mowdeck queue failed`",
            failed.len()
        );
    }
    Ok(())
}

fn cmd_route(config: &Config, command: &RouteCommand) -> Result<(), String> {
    match command {
        RouteCommand::Optimize { file } => {
            let sites: Vec<Waypoint> = read_json(file)?;
            print_json(&optimize_order(&sites))
        }
        RouteCommand::Plan { file, optimize } => {
            let mut sites: Vec<Waypoint> = read_json(file)?;
            if *optimize {
                sites = optimize_order(&sites);
            }

            let routing = &config.routing;
            let backend = OsrmBackend::new(&routing.url, &routing.profile, routing.timeout())
                .map_err(|e| format!("failed to set up routing client: {e}"))?;
            let client = RoutingClient::new(backend, routing.cache_capacity);

            let plan = plan_route(&client, &sites);
            eprintln!("{}", format_plan_summary(&plan));
            print_json(&plan)
        }
    }
}

fn cmd_notifications(config: &Config, storage: &Storage, file: &Path) -> Result<(), String> {
    let schedule: ServiceSchedule = read_json(file)?;
    let machine = storage
        .load_machine_state(&config.machine_id)
        .map_err(|e| format!("failed to load machine state: {e}"))?;
    let dismissed = storage
        .dismissed_notifications()
        .map_err(|e| format!("failed to load dismissed notifications: {e}"))?;

    let notifications = due_notifications(
        &schedule.intervals,
        &schedule.services,
        machine.motor_hours,
        &dismissed,
    );

    if notifications.is_empty() {
        println!("All good");
        return Ok(());
    }
    for n in &notifications {
        println!("{}", format_notification(n));
    }
    Ok(())
}

fn cmd_dismiss(storage: &Storage, key: &str) -> Result<(), String> {
    let added = storage
        .dismiss_notification(key)
        .map_err(|e| format!("failed to dismiss notification: {e}"))?;
    if added {
        eprintln!("Dismissed {key}");
    } else {
        eprintln!("{key} was already dismissed");
    }
    Ok(())
}

fn cmd_sun_glare(storage: &Storage, state: Option<Toggle>) -> Result<(), String> {
    if let Some(state) = state {
        storage
            .set_sun_glare(matches!(state, Toggle::On))
            .map_err(|e| format!("failed to save preference: {e}"))?;
    }
    let on = storage
        .sun_glare()
        .map_err(|e| format!("failed to read preference: {e}"))?;
    println!("{}", if on { "on" } else { "off" });
    Ok(())
}

/// Parses a record row given on the command line.
fn parse_row(json: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))? {
        Value::Object(row) => Ok(row),
        _ => Err("record must be a JSON object".to_string()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&contents).map_err(|e| format!("invalid JSON in {}: {e}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Resolve a failed-write reference (full UUID or unambiguous prefix).
fn resolve_failed(engine: &Engine, reference: &str) -> Result<QueuedWrite, String> {
    let failed = engine
        .failed_items()
        .map_err(|e| format!("failed to read failed writes: {e}"))?;

    let matches: Vec<&QueuedWrite> = failed
        .iter()
        .filter(|w| w.id.to_string().starts_with(reference))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no failed write matching '{reference}'")),
        [item] => Ok((*item).clone()),
        many => {
            let ids: Vec<String> = many.iter().map(|w| short_id(w.id)).collect();
            Err(format!(
                "'{reference}' is ambiguous: matches {} writes: {}",
                many.len(),
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_row_accepts_objects_only() {
        let row = parse_row(r#"{"mth_pri_servisu": 120.5}"#).unwrap();
        assert_eq!(row["mth_pri_servisu"], 120.5);

        assert!(parse_row("[1, 2]").unwrap_err().contains("JSON object"));
        assert!(parse_row("{").unwrap_err().starts_with("invalid JSON"));
    }

    #[test]
    fn parses_notification_command_forms() {
        let cli = Cli::try_parse_from(["mowdeck", "notifications", "schedule.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Notifications { file: Some(_), command: None }
        ));

        let cli = Cli::try_parse_from(["mowdeck", "notifications", "dismiss", "oil_300"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Notifications {
                command: Some(NotificationsCommand::Dismiss { .. }),
                ..
            }
        ));
    }

    #[test]
    fn offline_flag_is_global() {
        let cli = Cli::try_parse_from(["mowdeck", "mth", "set", "12.5", "--offline"]).unwrap();
        assert!(cli.offline);
        assert!(matches!(
            cli.command,
            Command::Mth { command: MthCommand::Set { .. } }
        ));
    }

    #[test]
    fn schedule_services_default_to_empty() {
        let schedule: ServiceSchedule = serde_json::from_str(
            r#"{ "intervals": [{ "id": "oil", "name": "Oil", "intervalMth": 100 }] }"#,
        )
        .unwrap();
        assert_eq!(schedule.intervals.len(), 1);
        assert!(schedule.services.is_empty());
    }
}
