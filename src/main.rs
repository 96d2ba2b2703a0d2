//! hrms - staff directory back end with batch CSV import.

use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use hrms as app;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use app::EmployeeService;
use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::db;
use app::import::parser::parse_date;
use app::models::employee::{CreateEmployee, UpdateEmployee};
use app::service::SeedOutcome;

/// Staff directory back end with batch CSV import.
#[derive(Parser)]
#[command(name = "hrms", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Explicit config file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the employees table if it does not exist
    InitDb,
    /// Import a CSV file as one atomic batch
    Import {
        file: PathBuf,
        /// Identifier stamped as creator (defaults to import.actor)
        #[arg(long)]
        actor: Option<String>,
    },
    /// Import the seed CSV when the employees table is empty
    Seed {
        /// Seed file (defaults to import.seed_file)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete every employee
    Clear,
    /// Print the number of employees
    Count,
    /// Print all employees as JSON
    List,
    /// Print one employee
    Show { id: Uuid },
    /// Create a single employee
    Create(CreateArgs),
    /// Partially update an employee
    Update(UpdateArgs),
    /// Delete one employee
    Delete { id: Uuid },
    /// List direct reports of a manager
    Subordinates { id: Uuid },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    middle_name: Option<String>,
    #[arg(long, default_value = "Employee")]
    position: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "Main Office")]
    site: String,
    #[arg(long, default_value = "General")]
    department: String,
    #[arg(long)]
    manager: Option<Uuid>,
    /// Defaults to now
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    end_date: Option<String>,
    #[arg(long)]
    picture: Option<String>,
    #[arg(long)]
    admin: bool,
    #[arg(long)]
    actor: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    id: Uuid,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    site: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long, conflicts_with = "no_manager")]
    manager: Option<Uuid>,
    /// Remove the manager link
    #[arg(long)]
    no_manager: bool,
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    end_date: Option<String>,
    #[arg(long)]
    admin: Option<bool>,
    #[arg(long)]
    actor: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    let (config, load_note) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, "Config loaded successfully"),
        ConfigLoadResult::Missing => (AppConfig::default(), "Config missing, using defaults"),
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {e}", config_path.display()),
    };

    let _log_guard = init_logging(&config.logging)?;
    tracing::info!("Config path: {:?} ({load_note})", config_path);

    let conn = db::connect(&config.database.connection_string(), config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    db::test_connection(&conn).await.context("Database is not reachable")?;

    let result = run(cli.command, &config, conn.clone()).await;

    if let Err(e) = db::disconnect(conn).await {
        tracing::warn!("Failed to close database pool: {e}");
    }
    result
}

async fn run(command: Command, config: &AppConfig, conn: sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let default_actor = config.import.actor.clone();

    match command {
        Command::InitDb => {
            db::create_tables(&conn).await?;
            tracing::info!("Schema ready");
        }
        Command::Import { file, actor } => {
            let service = EmployeeService::new(conn, config.import.clone());
            let actor = actor.unwrap_or(default_actor);
            let report = service.import_file(&file, &actor).await?;
            print_json(&ImportSummary::from(report))?;
        }
        Command::Seed { file } => {
            let Some(file) = file.or_else(|| config.import.seed_file.clone()) else {
                bail!("No seed file given and import.seed_file is not configured");
            };
            let service = EmployeeService::new(conn, config.import.clone());
            match service.seed(&file).await? {
                SeedOutcome::Seeded(report) => print_json(&ImportSummary::from(report))?,
                SeedOutcome::Skipped(count) => println!("Skipped: {count} employees already present"),
            }
        }
        Command::Clear => {
            let service = EmployeeService::new(conn, config.import.clone());
            let removed = service.clear().await?;
            println!("Removed {removed} employees");
        }
        Command::Count => {
            let service = EmployeeService::new(conn, config.import.clone());
            println!("{}", service.count().await?);
        }
        Command::List => {
            let service = EmployeeService::new(conn, config.import.clone());
            print_json(&service.list().await?)?;
        }
        Command::Show { id } => {
            let service = EmployeeService::new(conn, config.import.clone());
            print_json(&service.get(id).await?)?;
        }
        Command::Create(args) => {
            let service = EmployeeService::new(conn, config.import.clone());
            let actor = args.actor.clone().unwrap_or(default_actor);
            let data = CreateEmployee {
                first_name: args.first_name,
                middle_name: args.middle_name,
                last_name: args.last_name,
                email: args.email,
                position: args.position,
                address: args.address,
                site: args.site,
                department: args.department,
                manager_id: args.manager,
                start_date: match args.start_date.as_deref() {
                    Some(value) => cli_date(value)?,
                    None => Utc::now(),
                },
                end_date: args.end_date.as_deref().map(cli_date).transpose()?,
                picture: args.picture,
                is_admin: args.admin,
            };
            print_json(&service.create(data, &actor).await?)?;
        }
        Command::Update(args) => {
            let service = EmployeeService::new(conn, config.import.clone());
            let actor = args.actor.clone().unwrap_or(default_actor);
            let manager_id = if args.no_manager {
                Some(None)
            } else {
                args.manager.map(Some)
            };
            let data = UpdateEmployee {
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                position: args.position,
                address: args.address,
                site: args.site,
                department: args.department,
                manager_id,
                start_date: args.start_date.as_deref().map(cli_date).transpose()?,
                end_date: args.end_date.as_deref().map(cli_date).transpose()?.map(Some),
                is_admin: args.admin,
                ..Default::default()
            };
            print_json(&service.update(args.id, data, &actor).await?)?;
        }
        Command::Delete { id } => {
            let service = EmployeeService::new(conn, config.import.clone());
            print_json(&service.delete(id).await?)?;
        }
        Command::Subordinates { id } => {
            let service = EmployeeService::new(conn, config.import.clone());
            print_json(&service.subordinates(id).await?)?;
        }
    }

    Ok(())
}

/// JSON shape printed after an import.
#[derive(Serialize)]
struct ImportSummary {
    created: usize,
    employees: Vec<app::entities::employees::Model>,
    warnings: Vec<String>,
}

impl From<app::ImportReport> for ImportSummary {
    fn from(report: app::ImportReport) -> Self {
        Self {
            created: report.employees.len(),
            warnings: report.warnings.iter().map(ToString::to_string).collect(),
            employees: report.employees,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dates typed on the command line must parse; unlike CSV imports there is no fallback.
fn cli_date(value: &str) -> anyhow::Result<chrono::DateTime<Utc>> {
    parse_date(value).with_context(|| format!("Invalid date: {value}"))
}

/// Initialize console logging plus an optional daily rolling log file.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "hrms.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
