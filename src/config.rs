use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::fetch::SourceUrls;

pub const DB_ENV: &str = "PAIR_FINDER_DB";
pub const PRIMARY_URL_ENV: &str = "PAIR_FINDER_PRIMARY_URL";
pub const SECONDARY_URL_ENV: &str = "PAIR_FINDER_SECONDARY_URL";
pub const TIMEOUT_ENV: &str = "PAIR_FINDER_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.db.clone() {
        return Ok(p);
    }

    if let Some(p) = non_empty_env(DB_ENV) {
        return Ok(PathBuf::from(p));
    }

    Ok(pair_finder_home()?.join("db.lmdb"))
}

pub fn resolve_sources(cli: &Cli) -> SourceUrls {
    SourceUrls {
        primary: cli
            .primary_url
            .clone()
            .or_else(|| non_empty_env(PRIMARY_URL_ENV)),
        secondary: cli
            .secondary_url
            .clone()
            .or_else(|| non_empty_env(SECONDARY_URL_ENV)),
    }
}

pub fn resolve_timeout(cli: &Cli) -> Result<Duration> {
    if let Some(secs) = cli.timeout_secs {
        return Ok(Duration::from_secs(secs));
    }

    match non_empty_env(TIMEOUT_ENV) {
        Some(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{TIMEOUT_ENV} is not a number of seconds: {raw}"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(DEFAULT_TIMEOUT),
    }
}

pub fn clear_db(db_path: &Path) -> Result<()> {
    remove_file_if_exists(db_path, "db")?;
    remove_file_if_exists(&lmdb_lock_path(db_path), "db lock")?;
    Ok(())
}

fn pair_finder_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("pair-finder"))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn lmdb_lock_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push("-lock");
    PathBuf::from(os)
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_flags_take_precedence() -> Result<()> {
        let cli = Cli::parse_from([
            "pair-finder",
            "--db",
            "/tmp/pf.lmdb",
            "--primary-url",
            "http://a/1",
            "--secondary-url",
            "http://a/2",
            "--timeout-secs",
            "3",
            "stats",
        ]);
        assert_eq!(resolve_db_path(&cli)?, PathBuf::from("/tmp/pf.lmdb"));
        let urls = resolve_sources(&cli);
        assert_eq!(urls.primary.as_deref(), Some("http://a/1"));
        assert_eq!(urls.secondary.as_deref(), Some("http://a/2"));
        assert_eq!(resolve_timeout(&cli)?, Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn lock_path_sits_next_to_db() {
        assert_eq!(
            lmdb_lock_path(Path::new("/x/db.lmdb")),
            PathBuf::from("/x/db.lmdb-lock")
        );
    }

    #[test]
    fn clear_db_tolerates_missing_files() -> Result<()> {
        let path = std::env::temp_dir().join(format!(
            "pair_finder_clear_missing_{}.lmdb",
            std::process::id()
        ));
        clear_db(&path)?;
        Ok(())
    }
}
