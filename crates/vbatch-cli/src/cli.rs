//! `vbatch` - run a bulk VALUES statement from a JSON file of rows
//!
//! ```text
//! PG_NODE=analytics vbatch \
//!     --query "INSERT INTO people (name, age) VALUES (%s) RETURNING id" \
//!     --template "{name}, {age}::int" \
//!     --rows people.json --page-size 500 --fetch
//! ```

mod logging;
mod rows;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use vbatch_connection::settings::{CONFIG_ENV, NODE_ENV};
use vbatch_connection::{NodeSettings, PoolCache};
use vbatch_core::Connection;
use vbatch_drivers::DriverRegistry;
use vbatch_values::{ExecuteOptions, execute_values};

use crate::logging::LoggingConfig;

/// Run one bulk VALUES statement inside a single transaction
#[derive(Parser, Debug)]
#[command(name = "vbatch", version, about, long_about = None)]
struct Cli {
    /// Base query with exactly one `VALUES (%s)` placeholder
    #[arg(short = 'q', long = "query")]
    query: String,

    /// Row template, e.g. "{name}, {age}::int" or "%s, %s"
    #[arg(short = 't', long = "template")]
    template: String,

    /// JSON file with an array of rows (`-` reads stdin)
    #[arg(short = 'r', long = "rows")]
    rows: PathBuf,

    /// Rows per statement (default: all rows in one statement)
    #[arg(short = 'p', long = "page-size")]
    page_size: Option<usize>,

    /// Collect rows returned by each page (e.g. RETURNING) and print them
    #[arg(long = "fetch")]
    fetch: bool,

    /// Dump the failing statement when a page fails
    #[arg(long = "debug")]
    debug: bool,

    /// File receiving the failing statement in debug mode
    #[arg(long = "dump-to", value_name = "PATH", requires = "debug")]
    dump_to: Option<PathBuf>,

    /// Node to read from the settings file
    #[arg(long = "node", env = NODE_ENV)]
    node: String,

    /// Settings file (default: nearest project.toml)
    #[arg(long = "config", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override a connection setting, e.g. --set dbname=staging
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Borrow the connection from the node's pool instead of opening one
    #[arg(long = "pool")]
    pool: bool,

    /// Emit logs as JSON lines
    #[arg(long = "log-json")]
    log_json: bool,

    /// Also write rolling JSON log files (default directory when no value is given)
    #[arg(long = "log-dir", value_name = "DIR", num_args = 0..=1)]
    log_dir: Option<Option<PathBuf>>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let mut config = if self.verbose {
            LoggingConfig::verbose()
        } else {
            LoggingConfig::default()
        };
        config.json_console = self.log_json;
        config.log_dir = self
            .log_dir
            .clone()
            .map(|dir| dir.unwrap_or_else(logging::log_directory));
        config
    }

    fn execute_options(&self) -> ExecuteOptions {
        let mut options = ExecuteOptions::new()
            .with_fetch(self.fetch)
            .with_debug(self.debug);
        if let Some(page_size) = self.page_size {
            options = options.with_page_size(page_size);
        }
        if let Some(path) = &self.dump_to {
            options = options.with_dump_to(path);
        }
        options
    }
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

async fn run(cli: &Cli, cache: &PoolCache) -> anyhow::Result<()> {
    let records = rows::read_records(&cli.rows)?;
    let options = cli.execute_options();
    tracing::info!(rows = records.len(), node = %cli.node, "loaded rows");

    let fetched = if cli.pool {
        let pool = cache.pool(&cli.overrides).await?;
        let conn = pool.get().await?;
        execute_values(&*conn, &cli.query, &records, &cli.template, &options).await?
    } else {
        let conn: Arc<dyn Connection> = cache.connect(&cli.overrides).await?;
        execute_values(conn.as_ref(), &cli.query, &records, &cli.template, &options).await?
    };

    match fetched {
        Some(rows) => {
            println!("{}", rows::render_table(&rows));
            println!("{} row(s) returned", rows.len());
        }
        None => println!("{} row(s) processed", records.len()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(&cli.logging_config())?;

    let cwd = std::env::current_dir()?;
    let settings = NodeSettings::resolve(Some(cli.node.clone()), cli.config.clone(), &cwd)
        .context("failed to load node settings")?;
    let cache = PoolCache::new(settings, Arc::new(DriverRegistry::with_defaults()));

    let result = run(&cli, &cache).await;
    cache.close_all().await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "bulk execution failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        let base = [
            "vbatch",
            "--node",
            "local",
            "-q",
            "INSERT INTO t VALUES (%s)",
            "-t",
            "%s",
            "-r",
            "rows.json",
        ];
        Cli::try_parse_from(base.iter().chain(args)).unwrap()
    }

    #[test]
    fn test_override_parsing() {
        assert_eq!(
            parse_override("dbname=staging").unwrap(),
            ("dbname".to_string(), "staging".to_string())
        );
        assert_eq!(
            parse_override("options=-c search_path=app").unwrap(),
            ("options".to_string(), "-c search_path=app".to_string())
        );
        assert!(parse_override("dbname").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn test_execute_options_from_flags() {
        let cli = parse(&["--page-size", "50", "--fetch", "--debug", "--dump-to", "f.sql"]);
        let options = cli.execute_options();
        assert_eq!(options.page_size(), Some(50));
        assert!(options.fetch());
        assert!(options.debug());
        assert_eq!(options.dump_to(), Some(std::path::Path::new("f.sql")));
    }

    #[test]
    fn test_dump_to_requires_debug() {
        let result = Cli::try_parse_from([
            "vbatch", "--node", "n", "-q", "q", "-t", "%s", "-r", "r.json", "--dump-to", "f.sql",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_dir_without_value_uses_default_directory() {
        let cli = parse(&["--log-dir"]);
        assert_eq!(cli.logging_config().log_dir, Some(logging::log_directory()));

        let cli = parse(&["--log-dir", "/var/log/vbatch", "--log-json"]);
        let config = cli.logging_config();
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/vbatch")));
        assert!(config.json_console);
    }

    #[test]
    fn test_repeated_overrides() {
        let cli = parse(&["--set", "dbname=a", "--set", "user=b"]);
        assert_eq!(
            cli.overrides,
            vec![
                ("dbname".to_string(), "a".to_string()),
                ("user".to_string(), "b".to_string())
            ]
        );
    }
}
