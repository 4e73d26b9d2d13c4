use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for a proof-of-work ledger node")]
struct Cli {
    #[command(flatten)]
    target: Target,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct Target {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block carrying text or the contents of a file
    Mine {
        /// UTF-8 text to store in the block
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// File whose raw bytes become the payload
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Register one or more peers with the node
    Register {
        /// Peer endpoints, host:port or http(s)://host:port
        #[arg(required = true)]
        peers: Vec<String>,
    },
    /// Forget peers
    Unregister {
        #[arg(required = true)]
        peers: Vec<String>,
    },
    /// Ask the node to adopt the longest valid chain among its peers
    Resolve,
    /// Print the node's chain
    Chain,
    /// List the node's peers
    Peers,
    /// Check the node is up
    Health,
}

#[derive(Serialize, Default)]
struct MineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

#[derive(Serialize)]
struct NodesRequest {
    nodes: Vec<String>,
}

async fn mine_request(data: Option<String>, file: Option<PathBuf>) -> Result<MineRequest> {
    if let Some(path) = file {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        if bytes.is_empty() {
            bail!("{} is empty", path.display());
        }
        return Ok(MineRequest {
            payload: Some(hex::encode(bytes)),
            ..MineRequest::default()
        });
    }
    Ok(MineRequest {
        data,
        ..MineRequest::default()
    })
}

fn base_url(node: &str) -> String {
    node.trim_end_matches('/').to_string()
}

async fn send(req: RequestBuilder) -> Result<()> {
    let res = req.send().await.context("node did not answer")?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    if !status.is_success() {
        bail!("request failed with {status}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = base_url(&cli.target.node);
    let client = Client::new();
    debug!(%node, cmd = ?cli.cmd, "sending request");

    let req = match cli.cmd {
        Command::Mine { data, file } => client
            .post(format!("{node}/mine"))
            .json(&mine_request(data, file).await?),
        Command::Register { peers } => client
            .post(format!("{node}/nodes/register"))
            .json(&NodesRequest { nodes: peers }),
        Command::Unregister { peers } => client
            .delete(format!("{node}/nodes"))
            .json(&NodesRequest { nodes: peers }),
        Command::Resolve => client.get(format!("{node}/nodes/resolve")),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Peers => client.get(format!("{node}/nodes")),
        Command::Health => client.get(format!("{node}/health")),
    };
    send(req).await
}
