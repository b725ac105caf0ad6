//! # sockrpc CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Call a method (outputs raw JSON)
//! sockrpc call calc add -a '[40, 2]'
//!
//! # Use a specific config file
//! sockrpc call -c /etc/sockrpc.json billing charge -a '["acct-1", 100]'
//!
//! # Validate a config file
//! sockrpc check-config -c /etc/sockrpc.json
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=info` to see one line per call attempt.

use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use sockrpc_cli::commands;

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "sockrpc.json";

#[derive(FromArgs)]
/// sockrpc - call methods on framed socket RPC services
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    CheckConfig(CheckConfigArgs),
}

/// Arguments for a single RPC call.
///
/// # Example
///
/// ```bash
/// sockrpc call calc add -a '[1, 2]' | jq .
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a method on a configured module
struct CallArgs {
    /// module key as named in the config file
    #[argh(positional)]
    module: String,

    /// name of the remote method
    #[argh(positional)]
    method: String,

    /// JSON array of positional arguments (default: [])
    #[argh(option, short = 'a', long = "args", default = "\"[]\".into()")]
    args: String,

    /// path to the JSON config file (default: sockrpc.json)
    #[argh(option, short = 'c', long = "config", default = "PathBuf::from(DEFAULT_CONFIG)")]
    config: PathBuf,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "check-config")]
/// validate every module in a config file
struct CheckConfigArgs {
    /// path to the JSON config file (default: sockrpc.json)
    #[argh(option, short = 'c', long = "config", default = "PathBuf::from(DEFAULT_CONFIG)")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // stdout carries only results; warnings and call records go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(args) => {
            let output = commands::run_call(&args.config, &args.module, &args.method, &args.args)?;
            println!("{}", output);
        }
        Commands::CheckConfig(args) => {
            for line in commands::check_config(&args.config)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
