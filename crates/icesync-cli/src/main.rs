use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use icesync_core::{SyncConfig, SyncReport, WarehouseConfig, Severity};
use icesync_catalog::{SnowflakeWarehouse, SqlExecutor};
use icesync_engine::{Reconciler, ReconciliationPlan, StatementBuilder};

const DEFAULT_CONFIG_FILE: &str = "icesync.toml";

/// icesync - Keep warehouse Iceberg tables in step with an external catalog
#[derive(Parser)]
#[command(name = "icesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: icesync.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the catalog integration name
    #[arg(long, global = true, env = "ICESYNC_CATALOG_INTEGRATION")]
    catalog_integration: Option<String>,

    /// Override the external volume name
    #[arg(long, global = true, env = "ICESYNC_EXTERNAL_VOLUME")]
    external_volume: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace every catalog table and handle orphans
    Sync {
        /// Output file for the JSON report
        #[arg(short, long, default_value = "icesync-report.json")]
        output: PathBuf,

        /// Drop orphan tables instead of only printing the DROP statements
        #[arg(long)]
        drop_orphans: bool,
    },

    /// Show the statements a sync would run, without running them
    Plan,

    /// Verify warehouse credentials
    CheckConnection,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let mut config = if let Some(config_path) = &cli.config {
        SyncConfig::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        SyncConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        SyncConfig::default()
    };

    if let Some(integration) = cli.catalog_integration {
        config.catalog_integration = integration;
    }
    if let Some(volume) = cli.external_volume {
        config.external_volume = volume;
    }

    match cli.command {
        Commands::Sync { output, drop_orphans } => {
            if drop_orphans {
                config.drop_orphans = true;
            }
            sync_command(&config, &output, cli.verbose).await
        }
        Commands::Plan => plan_command(&config, cli.verbose).await,
        Commands::CheckConnection => check_connection_command(&config, cli.verbose).await,
    }
}

/// Sync command - reconcile the database with the external catalog
async fn sync_command(config: &SyncConfig, output: &Path, verbose: bool) -> Result<()> {
    config.validate()?;
    let warehouse = connect(config, verbose).await?;

    if verbose {
        eprintln!(
            "{} {} {}",
            "Reconciling catalog".cyan(),
            config.catalog_integration,
            if config.drop_orphans { "(dropping orphans)" } else { "(report-only)" }
        );
    }

    let outcome = Reconciler::new(&warehouse, &warehouse, &warehouse, config)
        .run()
        .await?;

    let report = outcome.into_report();
    report.save_to_file(output)?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_sync_summary(&report);

    Ok(())
}

/// Plan command - list both sides and print what a sync would do
async fn plan_command(config: &SyncConfig, verbose: bool) -> Result<()> {
    config.validate()?;
    let warehouse = connect(config, verbose).await?;

    let plan = Reconciler::new(&warehouse, &warehouse, &warehouse, config)
        .plan()
        .await?;

    print_plan(&plan, &StatementBuilder::from_config(config), config.drop_orphans);

    Ok(())
}

/// Check connection command - authenticate and run a trivial query
async fn check_connection_command(config: &SyncConfig, verbose: bool) -> Result<()> {
    connect(config, verbose).await?;
    println!("{}", "✓ Connection successful".green());
    Ok(())
}

/// Build the warehouse client from config and environment, then test it
async fn connect(config: &SyncConfig, verbose: bool) -> Result<SnowflakeWarehouse> {
    let warehouse_config = config.warehouse.clone().unwrap_or_default();

    if !warehouse_config.warehouse_type.eq_ignore_ascii_case("snowflake") {
        return Err(anyhow::anyhow!(
            "Unsupported warehouse type '{}'. Supported: snowflake",
            warehouse_config.warehouse_type
        ));
    }

    if verbose {
        eprintln!("{} {}...", "Connecting to".cyan(), warehouse_config.warehouse_type);
    }

    let warehouse = build_snowflake(&warehouse_config, config)?;

    if verbose {
        eprintln!("{}", "Testing warehouse connection...".cyan());
    }

    warehouse.test_connection().await
        .map_err(|e| anyhow::anyhow!("Failed to connect to warehouse: {}", e))?;

    Ok(warehouse)
}

/// Resolve a connection setting from the config file, then the environment
fn setting(warehouse: &WarehouseConfig, key: &str, env: &str) -> Option<String> {
    warehouse
        .setting(key)
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok())
}

fn build_snowflake(warehouse: &WarehouseConfig, config: &SyncConfig) -> Result<SnowflakeWarehouse> {
    let account = setting(warehouse, "account", "SNOWFLAKE_ACCOUNT")
        .ok_or_else(|| anyhow::anyhow!("Snowflake requires 'account' in warehouse settings or SNOWFLAKE_ACCOUNT"))?;
    let username = setting(warehouse, "username", "SNOWFLAKE_USER")
        .ok_or_else(|| anyhow::anyhow!("Snowflake requires 'username' in warehouse settings or SNOWFLAKE_USER"))?;

    let mut builder = if let Some(password) = setting(warehouse, "password", "SNOWFLAKE_PASSWORD") {
        SnowflakeWarehouse::builder().with_password(account, username, password)
    } else if let Some(key_path) = setting(warehouse, "private_key_path", "SNOWFLAKE_PRIVATE_KEY_PATH") {
        let pem = std::fs::read_to_string(&key_path)
            .map_err(|e| anyhow::anyhow!("Failed to read private key {}: {}", key_path, e))?;
        SnowflakeWarehouse::builder().with_key_pair(account, username, pem)
    } else {
        return Err(anyhow::anyhow!(
            "Snowflake requires 'password' or 'private_key_path' in warehouse settings"
        ));
    };

    if let Some(wh) = setting(warehouse, "warehouse", "SNOWFLAKE_WAREHOUSE") {
        builder = builder.with_warehouse(wh);
    }
    if let Some(role) = setting(warehouse, "role", "SNOWFLAKE_ROLE") {
        builder = builder.with_role(role);
    }
    if let Some(database) = setting(warehouse, "database", "SNOWFLAKE_DATABASE") {
        builder = builder.with_database(database);
    }

    Ok(builder.with_sync_config(config).build()?)
}

/// Print the reconciliation plan
fn print_plan(plan: &ReconciliationPlan, builder: &StatementBuilder, drop_orphans: bool) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Reconciliation Plan".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Tables to ensure: {}", plan.ensure_set.len());
    println!("Already present:  {}", plan.matched.len());
    println!("Orphans:          {}", plan.orphan_set.len());
    println!();

    for table in &plan.ensure_set {
        for sql in builder.statements_for(table) {
            println!("{};", sql);
            println!();
        }
    }

    if !plan.orphan_set.is_empty() {
        let verb = if drop_orphans { "Will drop" } else { "Will suggest" };
        println!("{}", format!("{} {} orphan tables:", verb, plan.orphan_set.len()).yellow().bold());
        for key in &plan.orphan_set {
            println!("  {};", StatementBuilder::build_drop_statement(key));
        }
        println!();
    }

    println!("{}", "=".repeat(60).bright_blue());
}

/// Print sync summary to stdout
fn print_sync_summary(report: &SyncReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Catalog Sync Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Catalog tables:      {}", report.summary.catalog_tables);
    println!("  Tables ensured:      {}", report.summary.tables_ensured);
    println!("  Already present:     {}", report.summary.tables_matched);
    println!("  Statements executed: {}", report.summary.statements_executed);

    if report.summary.orphans_detected > report.summary.orphans_dropped {
        println!("  Orphans:             {}", format!("{}", report.summary.orphans_detected).yellow());
    } else {
        println!("  Orphans:             {}", format!("{}", report.summary.orphans_detected).green());
    }
    println!("  Orphans dropped:     {}", report.summary.orphans_dropped);
    println!();

    if !report.statements.is_empty() {
        println!("{}", "Statements:".bold());
        for record in &report.statements {
            let first_line = record.sql.lines().next().unwrap_or_default();
            println!(
                "  [{}] {} {}",
                record.statement_timestamp.format("%H:%M:%S%.6f"),
                first_line,
                record.status().unwrap_or_default().dimmed()
            );
        }
        println!();
    }

    for diag in &report.diagnostics {
        let severity_str = match diag.severity {
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };
        println!("  [{}] {}: {}", severity_str, diag.code, diag.message);
    }

    let pending: Vec<_> = report.pending_drops().collect();
    if !pending.is_empty() {
        println!();
        println!("{}", "Orphan tables detected. Run the following to drop them:".yellow().bold());
        for orphan in pending {
            println!("{};", orphan.sql);
        }
    } else if report.orphans.is_empty() {
        println!("{}", "✓ No orphan tables".green().bold());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
