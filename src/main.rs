use anyhow::{Context, Result};
use clap::Parser;
use pair_finder::cache::PersistentCache;
use pair_finder::cli::{Cli, Commands, OutputFormat};
use pair_finder::config::{clear_db, resolve_db_path, resolve_sources, resolve_timeout};
use pair_finder::fetch::HttpSource;
use pair_finder::index::{Category, Entry};
use pair_finder::parse::{ParseStats, hash_content, parse_table};
use pair_finder::session::{PairStats, Session};
use pair_finder::status::Status;
use serde::Serialize;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(&cli.log_level);

    match cli.command.clone() {
        Commands::Clear => {
            let db_path = resolve_db_path(&cli)?;
            clear_db(&db_path)?;
        }
        Commands::Stats => {
            let cache = PersistentCache::open(resolve_db_path(&cli)?)?;
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        Commands::Parse { file } => {
            let text = read_sheet(&file)?;
            let report = parse_table(&text);
            let output = ParseOutput {
                file: file.to_string_lossy().to_string(),
                digest: hash_content(&text),
                keys: report.index.key_count(),
                entries: report.index.entry_count(),
                stats: report.stats,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Refresh => {
            let mut session = open_session(&cli)?;
            session.refresh().await;
            println!("{}", serde_json::to_string_pretty(&acquire_output(&session))?);
        }
        Commands::Find {
            key,
            category,
            format,
            refresh,
        } => {
            let mut session = open_session(&cli)?;
            if refresh {
                session.refresh().await;
            } else {
                session.start().await;
            }
            let acquired = session.status().clone();
            session.select(category);
            let entry = session.find(&key);
            let result = FindResult {
                key: key.trim().to_uppercase(),
                category,
                found: entry.is_some(),
                status: session.status().label(),
                data_status: acquired.to_string(),
                last_updated: session.captured_at().map(str::to_string),
                entry,
            };
            write_find_output(&result, format)?;
        }
    }

    Ok(())
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_find(args))
}

fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["find", "refresh", "parse", "stats", "clear", "help"];
    let valued = [
        "--db",
        "--primary-url",
        "--secondary-url",
        "--timeout-secs",
        "--log-level",
    ];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if valued.contains(&a) {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_session(cli: &Cli) -> Result<Session<HttpSource>> {
    let cache = PersistentCache::open(resolve_db_path(cli)?)?;
    let source = HttpSource::new(resolve_sources(cli), resolve_timeout(cli)?)
        .context("Failed to build HTTP client")?;
    Ok(Session::new(cache, source))
}

fn read_sheet(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sheet: {}", path.display()))
}

#[derive(Debug, Serialize)]
struct FindResult {
    key: String,
    category: Category,
    found: bool,
    status: &'static str,
    data_status: String,
    last_updated: Option<String>,
    #[serde(flatten)]
    entry: Option<Entry>,
}

#[derive(Debug, Serialize)]
struct AcquireOutput {
    status: &'static str,
    last_updated: Option<String>,
    detail: Status,
    primary_keys: usize,
    secondary_keys: usize,
    parse: Option<PairStats>,
}

#[derive(Debug, Serialize)]
struct ParseOutput {
    file: String,
    digest: String,
    keys: usize,
    entries: usize,
    stats: ParseStats,
}

fn acquire_output(session: &Session<HttpSource>) -> AcquireOutput {
    let status = session.status();
    AcquireOutput {
        status: status.label(),
        last_updated: status.annotation().map(str::to_string),
        detail: status.clone(),
        primary_keys: session.index(Category::Primary).key_count(),
        secondary_keys: session.index(Category::Secondary).key_count(),
        parse: session.parse_stats(),
    }
}

fn write_find_output(result: &FindResult, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("key: {} ({})\n", result.key, result.category));
            match result.entry.as_ref() {
                Some(entry) => {
                    if !entry.note.is_empty() {
                        out.push_str(&format!("note: {}\n", entry.note));
                    }
                    out.push_str(&format!("value: {}\n", entry.value));
                }
                None => out.push_str(&format!("{}\n", result.status)),
            }
            out.push_str(&format!("data: {}\n", result.data_status));
            out
        }
        OutputFormat::Value => result
            .entry
            .as_ref()
            .map(|e| e.value.clone())
            .unwrap_or_default(),
    };

    print!("{content}");
    if !content.is_empty() && !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
