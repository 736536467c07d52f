//! Codescout MCP Server
//!
//! Exposes multi-project semantic code search to AI agents over MCP.
//!
//! ## Tools
//!
//! - `search` - Hybrid semantic + keyword search, auto-indexing on first use
//! - `index` - Build or refresh a project's index
//! - `status` - Report tracked projects without triggering any indexing
//! - `watch_start` - Keep a project's index fresh via file watching
//! - `watch_stop` - Stop watching one project, or all of them
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "codescout": {
//!       "command": "codescout-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use codescout_embeddings::RemoteEmbeddingClient;
use codescout_registry::{SearchService, ServiceConfig};
use rmcp::{transport::stdio, ServiceExt};
use std::env;
use std::sync::Arc;

mod tools;

use tools::catalog;
use tools::CodescoutService;

fn print_help() {
    println!("Codescout MCP server");
    println!();
    println!("Usage: codescout-mcp [--print-tools|--version|--help]");
    println!();
    println!("Flags:");
    println!("  --print-tools  Print tool inventory as JSON and exit");
    println!("  --version      Print version and exit");
    println!("  --help         Print this help and exit");
}

fn handle_cli_args() -> Option<i32> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }

    if args.len() == 1 {
        match args[0].as_str() {
            "--print-tools" => {
                println!("{}", catalog::tool_inventory_json(env!("CARGO_PKG_VERSION")));
                return Some(0);
            }
            "--version" | "-V" => {
                println!("codescout-mcp {}", env!("CARGO_PKG_VERSION"));
                return Some(0);
            }
            "--help" | "-h" => {
                print_help();
                return Some(0);
            }
            _ => {}
        }
    }

    eprintln!("Unknown arguments: {}", args.join(" "));
    print_help();
    Some(2)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(exit_code) = handle_cli_args() {
        std::process::exit(exit_code);
    }

    // Logging goes to stderr only; stdout carries the MCP protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting Codescout MCP server");

    let config = ServiceConfig::from_env();
    let embedder = Arc::new(RemoteEmbeddingClient::new(config.embedding.clone())?);
    let service = Arc::new(SearchService::new(config, embedder));

    // Warm paths index in the background; the server accepts requests
    // immediately and cold projects just pay their build on first use.
    let warm = service.clone();
    tokio::spawn(async move {
        warm.warm_up().await;
    });

    let server = CodescoutService::new(service.clone()).serve(stdio()).await?;
    server.waiting().await?;

    service.shutdown().await;
    log::info!("Codescout MCP server stopped");
    Ok(())
}
