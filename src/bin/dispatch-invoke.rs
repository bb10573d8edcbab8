//! Single-invocation entry point: one event in, one response out.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use http_dispatch::serverless::{invoke, ServerlessEvent};
use http_dispatch::{demo, observability, App};

#[derive(Parser)]
#[command(name = "dispatch-invoke")]
#[command(about = "Dispatch one serverless event and print the response", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event JSON file, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    event: String,

    /// Pretty-print the response.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut app = match &cli.config {
        Some(path) => App::load(path)?,
        None => App::new(),
    };
    observability::logging::init(&app.config().observability);
    demo::register(&mut app)?;

    let raw = if cli.event == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&cli.event)?
    };
    let event: ServerlessEvent = serde_json::from_str(&raw)?;

    let response = invoke(&app, event).await;
    let output = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", output);
    Ok(())
}
