use anyhow::Result;
use clap::{Parser, Subcommand};
use longchain_core::Transaction;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "longchain-cli")]
#[command(about = "CLI client for a longchain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, env = "LONGCHAIN_NODE", default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending pool
    Submit {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        receiver: String,
        #[arg(long)]
        amount: f64,
    },
    /// Mine the pending pool into a new block
    Mine,
    /// Print the node's full chain
    Chain,
    /// Print the node's pending transactions
    Pending,
    /// Register peer nodes (host:port or URL)
    Register {
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Run longest-chain consensus against the registered peers
    Resolve,
}

#[derive(Serialize)]
struct RegisterNodes {
    nodes: Vec<String>,
}

async fn print_response(res: Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
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
    let node = cli.node.trim_end_matches('/');
    let client = Client::new();
    debug!(node, command = ?cli.cmd, "sending request");

    let res = match cli.cmd {
        Command::Submit {
            sender,
            receiver,
            amount,
        } => {
            let tx = Transaction::new(sender, receiver, amount);
            client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Mine => client.post(format!("{node}/mine")).send().await?,
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Pending => {
            client
                .get(format!("{node}/transactions/pending"))
                .send()
                .await?
        }
        Command::Register { nodes } => {
            client
                .post(format!("{node}/nodes/register"))
                .json(&RegisterNodes { nodes })
                .send()
                .await?
        }
        Command::Resolve => client.get(format!("{node}/nodes/resolve")).send().await?,
    };
    print_response(res).await
}
