// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use nestpath_mcp::config::McpConfig;
use nestpath_mcp::server::McpServer;
use nestpath_mcp::tools::default_registry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "nestpath=info";

#[derive(Parser, Debug)]
#[command(name = "nestpath-mcp")]
#[command(about = "JSON path addressing and base64 expansion tools over MCP", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "nestpath.toml", env = "NESTPATH_CONFIG")]
    config: PathBuf,

    /// Log filter, overriding RUST_LOG (default: nestpath=info)
    #[arg(long)]
    log_level: Option<String>,
}

/// `--log-level` wins, then RUST_LOG, then the default filter
fn log_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("nestpath MCP server starting...");

    let config = McpConfig::load(&args.config)?;
    let expander = config.expander();

    let registry = default_registry(expander);
    let tools: Vec<String> = registry
        .list_schemas()
        .into_iter()
        .map(|schema| schema.name)
        .collect();
    tracing::info!("Registered {} tools: {}", tools.len(), tools.join(", "));

    let mut server = McpServer::new(registry)
        .with_name(config.server.name.clone())
        .with_max_line_length(config.server.max_line_length);
    if config.expand.expand_arguments {
        tracing::info!(max_depth = expander.max_depth(), "Expanding base64 tool arguments");
        server = server.with_argument_expansion(expander);
    }

    server.start().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flag_overrides_environment() {
        std::env::set_var("RUST_LOG", "trace");
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
        assert_eq!(log_filter(None).to_string(), "trace");

        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter(None).to_string(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["nestpath-mcp", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));

        let args = Args::try_parse_from(["nestpath-mcp", "-c", "other.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("other.toml"));
        assert_eq!(args.log_level, None);
    }
}
