use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use quickask::api::create_router;
use quickask::config::CONFIG;
use quickask::gateway::SearchGateway;
use quickask::render::render_state;
use quickask::session::{HttpTransport, SearchOutcome, SearchSession};

#[derive(Parser)]
#[command(name = "quickask", version, about = "Web search with a short summary answer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP search service
    Serve {
        /// Address to listen on, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ask a running service; without a query, read questions from stdin
    Ask {
        /// Search endpoint, overrides SEARCH_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { bind } => serve(bind.unwrap_or_else(|| CONFIG.bind_addr.clone())).await,
        Command::Ask { endpoint, query } => ask(endpoint, query.join(" ")).await,
    }
}

async fn serve(bind: String) -> anyhow::Result<()> {
    let gateway = SearchGateway::from_config().context("failed to build search gateway")?;
    let app = create_router(Arc::new(gateway), &CONFIG.static_dir);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn ask(endpoint: Option<String>, query: String) -> anyhow::Result<()> {
    let session = match endpoint {
        Some(endpoint) => SearchSession::new(
            Arc::new(HttpTransport::new(&endpoint)?),
            CONFIG.client_timeout,
        ),
        None => SearchSession::from_config()?,
    };

    if !query.trim().is_empty() {
        session.search(&query).await;
        print!("{}", render_state(&session.state()));
        return Ok(());
    }

    print!("{}", render_state(&session.state()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if session.search(&line).await == SearchOutcome::Ignored {
            continue;
        }
        println!("{}", render_state(&session.state()));
    }
    Ok(())
}
