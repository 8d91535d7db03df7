use anyhow::Result;
use clap::Parser;

use ee_mcp::config::Config;
use ee_mcp::server::McpServer;

#[derive(Parser)]
#[command(name = "ee-mcp", version, about = "MCP bridge for ExpressionEngine content", long_about = None)]
struct Cli {
    /// Log filter, e.g. "ee_mcp=debug" (falls back to EE_MCP_LOG, then info)
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = cli
        .log
        .or_else(|| std::env::var("EE_MCP_LOG").ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "ee_mcp=info".to_string());
    // stdout belongs to the protocol; logs must stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::info!(api_url = %config.api_url, "initialized EE MCP server");

    let server = McpServer::new(config);
    server.run_stdio()
}
