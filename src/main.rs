// ==========================================
// 层级导入 - 命令行入口
// ==========================================
// 子命令: import / template / logs / init-db
// ==========================================

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hierarchy_import::db::{get_default_db_path, init_schema, open_sqlite_connection};
use hierarchy_import::importer::{validator::parse_date, write_template};
use hierarchy_import::repository::HierarchyRepositoryImpl;
use hierarchy_import::{logging, DatePeriod, ImportApi, Uploader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Bulk import of objectives, initiatives and activities from spreadsheets
#[derive(Parser, Debug)]
#[command(name = "hierarchy-import", version, about, long_about = None)]
struct Cli {
    /// SQLite database path (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a .xlsx/.xls/.csv file
    Import {
        /// File to import
        file: PathBuf,

        #[arg(long)]
        tenant: String,

        /// Uploader user id
        #[arg(long)]
        user: String,

        /// Uploader role (checked against import.roles)
        #[arg(long, default_value = "admin")]
        role: String,

        /// Only keep rows whose dates fall on or after this date
        #[arg(long, requires = "period_end")]
        period_start: Option<String>,

        /// Only keep rows whose dates fall on or before this date
        #[arg(long, requires = "period_start")]
        period_end: Option<String>,
    },

    /// Write the canonical CSV template
    Template {
        /// Output file
        output: PathBuf,

        /// Include one example row per level
        #[arg(long)]
        with_examples: bool,
    },

    /// Show recent import logs
    Logs {
        #[arg(long)]
        tenant: String,

        #[arg(long, default_value = "20")]
        limit: usize,

        /// Show a single log by id
        #[arg(long)]
        id: Option<String>,
    },

    /// Create the schema and optionally seed owner profiles
    InitDb {
        /// Owner profile to create, as TENANT:EMAIL (repeatable)
        #[arg(long = "profile", value_name = "TENANT:EMAIL")]
        profiles: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::debug!(db_path = %db_path, "使用数据库");

    match cli.command {
        Commands::Import {
            file,
            tenant,
            user,
            role,
            period_start,
            period_end,
        } => {
            let period = match (period_start, period_end) {
                (Some(start), Some(end)) => Some(DatePeriod::new(
                    parse_date(&start).with_context(|| format!("invalid --period-start: {start}"))?,
                    parse_date(&end).with_context(|| format!("invalid --period-end: {end}"))?,
                )),
                _ => None,
            };

            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let api = ImportApi::new(&db_path)?;
            let uploader = Uploader {
                user_id: user,
                tenant_id: tenant,
                role,
            };
            let result = api.import_file(&uploader, &file_name, bytes, period).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Template {
            output,
            with_examples,
        } => {
            let file = std::fs::File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            write_template(file, with_examples)?;
            tracing::info!(output = %output.display(), "模板已生成");
        }

        Commands::Logs { tenant, limit, id } => {
            let api = ImportApi::new(&db_path)?;
            match id {
                Some(id) => {
                    let log = api.get_import_log(&id)?;
                    println!("{}", serde_json::to_string_pretty(&log)?);
                }
                None => {
                    let logs = api.list_import_logs(&tenant, limit)?;
                    println!("{}", serde_json::to_string_pretty(&logs)?);
                }
            }
        }

        Commands::InitDb { profiles } => {
            let conn = open_sqlite_connection(&db_path)?;
            init_schema(&conn)?;

            let repo = HierarchyRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)));
            for entry in profiles {
                let Some((tenant, email)) = entry.split_once(':') else {
                    bail!("invalid --profile '{entry}', expected TENANT:EMAIL");
                };
                let id = repo.insert_profile(tenant.trim(), email.trim(), None)?;
                tracing::info!(tenant = %tenant, email = %email, profile_id = %id, "负责人档案已创建");
            }
            tracing::info!(db_path = %db_path, "数据库初始化完成");
        }
    }

    Ok(())
}
