//! mysql-tpdump CLI - dump everything in the database connected to a
//! given table through foreign keys.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mysql_tpdump::{
    Config, DatabaseConfig, DumpConfig, DumpEngine, DumpError, MatchMode, MysqlSource,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mysql-tpdump")]
#[command(about = "Dump the referential closure of one table as a replayable SQL script")]
#[command(version)]
struct Cli {
    /// MySQL database name
    #[arg(short = 'd', long)]
    dbname: Option<String>,

    /// Database user
    #[arg(short, long)]
    user: Option<String>,

    /// Database password
    #[arg(short, long, default_value = "")]
    password: String,

    /// Database host [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Database port [default: 3306]
    #[arg(long)]
    port: Option<u16>,

    /// Table to start with
    #[arg(short = 't', long = "tbl")]
    table: Option<String>,

    /// Where clause for the starting table; example: "id in (1,2,3)"
    #[arg(short = 'w', long = "where")]
    r#where: Option<String>,

    /// Main dump statement verb [default: REPLACE]
    #[arg(short = 's', long)]
    dump_statement: Option<String>,

    /// Maximum indexed values per column set before falling back to
    /// in-memory filtering [default: 20]
    #[arg(long)]
    max_values: Option<usize>,

    /// Row retention under fallback scanning: any or all references
    /// must match [default: any]
    #[arg(long)]
    match_mode: Option<MatchMode>,

    /// Name of output file [default: standard output]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional YAML configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the run summary as JSON to stderr
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DumpError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(DumpError::Config)?;

    let config = build_config(&cli)?;
    info!(
        table = %config.dump.table,
        database = %config.database.database,
        "starting dump"
    );

    let source = MysqlSource::connect(&config.database).await?;

    let summary = match &cli.output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            DumpEngine::new(&source, &config, file).run().await?
        }
        None => {
            let stdout = std::io::stdout().lock();
            DumpEngine::new(&source, &config, stdout).run().await?
        }
    };

    if cli.output_json {
        eprintln!("{}", summary.to_json()?);
    } else {
        eprintln!(
            "Dumped {} rows from {} tables ({} skipped)",
            summary.rows_written, summary.tables_dumped, summary.tables_skipped
        );
    }

    Ok(())
}

/// Build the effective configuration: the optional YAML file first,
/// then command-line flags on top.
fn build_config(cli: &Cli) -> Result<Config, DumpError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let database = cli
                .dbname
                .clone()
                .ok_or_else(|| DumpError::Config("--dbname is required".into()))?;
            let user = cli
                .user
                .clone()
                .ok_or_else(|| DumpError::Config("--user is required".into()))?;
            let table = cli
                .table
                .clone()
                .ok_or_else(|| DumpError::Config("--tbl is required".into()))?;
            Config {
                database: DatabaseConfig {
                    host: "localhost".to_string(),
                    port: 3306,
                    database,
                    user,
                    password: String::new(),
                },
                dump: DumpConfig {
                    table,
                    r#where: None,
                    insert_verb: "REPLACE".to_string(),
                    max_values_per_column_set: 20,
                    match_mode: MatchMode::Any,
                },
            }
        }
    };

    if let Some(host) = &cli.host {
        config.database.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.database.port = port;
    }
    if let Some(database) = &cli.dbname {
        config.database.database = database.clone();
    }
    if let Some(user) = &cli.user {
        config.database.user = user.clone();
    }
    if !cli.password.is_empty() {
        config.database.password = cli.password.clone();
    }
    if let Some(table) = &cli.table {
        config.dump.table = table.clone();
    }
    if cli.r#where.is_some() {
        config.dump.r#where = cli.r#where.clone();
    }
    if let Some(verb) = &cli.dump_statement {
        config.dump.insert_verb = verb.clone();
    }
    if let Some(max_values) = cli.max_values {
        config.dump.max_values_per_column_set = max_values;
    }
    if let Some(match_mode) = cli.match_mode {
        config.dump.match_mode = match_mode;
    }

    config.validate()?;
    Ok(config)
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr: stdout carries the dump itself.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
