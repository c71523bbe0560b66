// ==========================================
// 计量读数导入系统 - 命令行入口
// ==========================================
// 子命令: init-db / import / deltas / runs / config
// 约束: stdout 只输出报告与查询结果，日志写 stderr
// ==========================================

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use meter_import::api::{ApiError, ImportApi, ImportOverrides};
use meter_import::config::import_config::parse_delimiter;
use meter_import::config::DecimalSeparator;
use meter_import::i18n::{self, t, t_with_args};
use meter_import::{db, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Import meter readings into the consumption log", long_about = None)]
struct Cli {
    /// SQLite database file (default: $METER_IMPORT_DB_PATH or the user data dir)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<String>,

    /// Message language: es, en, zh-CN
    #[arg(long, default_value = i18n::DEFAULT_LOCALE, global = true)]
    locale: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema (idempotent)
    InitDb,

    /// Import a spreadsheet or delimited text file of readings
    Import {
        /// File to import (.xlsx, .xls, .ods, .csv, .txt, .tsv)
        file: PathBuf,

        /// Decimal separator of the consumption column: "." or ","
        #[arg(long, value_name = "SEP")]
        decimal_separator: Option<String>,

        /// Accepted date format (chrono strftime), repeat in priority order
        #[arg(long = "date-format", value_name = "FMT")]
        date_formats: Vec<String>,

        /// Read ambiguous dates as month/day/year
        #[arg(long)]
        month_first: bool,

        /// Column delimiter for text files (",", ";", "tab", ...)
        #[arg(long, value_name = "C")]
        delimiter: Option<String>,

        /// Keep the staging table populated after a successful run
        #[arg(long)]
        keep_staging: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show consumption deltas of a meter, newest first
    Deltas {
        /// Meter name (exact match)
        device: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List recent import runs
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show or change stored import settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print stored settings
    Show,
    /// Store a setting
    Set { key: String, value: String },
}

fn build_overrides(
    decimal_separator: Option<String>,
    date_formats: Vec<String>,
    month_first: bool,
    delimiter: Option<String>,
    keep_staging: bool,
) -> anyhow::Result<ImportOverrides> {
    let decimal_separator = decimal_separator
        .map(|raw| {
            raw.parse::<DecimalSeparator>()
                .map_err(|_| anyhow!("invalid decimal separator: {}", raw))
        })
        .transpose()?;
    let csv_delimiter = delimiter
        .map(|raw| parse_delimiter(&raw).ok_or_else(|| anyhow!("invalid delimiter: {}", raw)))
        .transpose()?;

    Ok(ImportOverrides {
        decimal_separator,
        date_formats,
        month_first,
        csv_delimiter,
        keep_staging,
    })
}

fn user_error(err: ApiError) -> anyhow::Error {
    anyhow!(err.localized_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    let locale = i18n::set_locale(&cli.locale);

    let db_path = cli.db.unwrap_or_else(db::default_db_path);
    tracing::debug!(db_path = %db_path, locale, "启动");

    let api = ImportApi::open(&db_path)
        .map_err(user_error)
        .with_context(|| format!("cannot open database {}", db_path))?;

    match cli.command {
        Commands::InitDb => {
            println!("{}", t_with_args("cli.init_db_done", &[("path", &db_path)]));
        }

        Commands::Import {
            file,
            decimal_separator,
            date_formats,
            month_first,
            delimiter,
            keep_staging,
            json,
        } => {
            let overrides =
                build_overrides(decimal_separator, date_formats, month_first, delimiter, keep_staging)?;
            let report = api.import_file(&file, &overrides).await.map_err(user_error)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }

        Commands::Deltas { device, limit } => {
            let deltas = api.consumption_deltas(&device, limit).map_err(user_error)?;
            if deltas.is_empty() {
                println!("{}", t_with_args("cli.no_deltas", &[("device", &device)]));
            }
            for d in deltas {
                let fmt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    d.timestamp.format("%Y-%m-%d %H:%M"),
                    fmt(d.value),
                    fmt(d.previous_value),
                    fmt(d.delta)
                );
            }
        }

        Commands::Runs { limit } => {
            let runs = api.recent_runs(limit).map_err(user_error)?;
            if runs.is_empty() {
                println!("{}", t("cli.no_runs"));
            }
            for run in runs {
                println!(
                    "{}\t{}\t{}\t{}/{}/{}",
                    run.started_at,
                    run.run_id,
                    run.file_name.as_deref().unwrap_or("-"),
                    run.total_rows,
                    run.rejected_rows,
                    run.committed_rows
                );
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                for (key, value) in api.config_values().map_err(user_error)? {
                    println!("{} = {}", key, value);
                }
            }
            ConfigAction::Set { key, value } => {
                api.set_config_value(&key, &value).map_err(user_error)?;
                println!(
                    "{}",
                    t_with_args("cli.config_set", &[("key", &key), ("value", &value)])
                );
            }
        },
    }

    Ok(())
}
