// crates/kjvonly-cli/src/main.rs
//
// CLI entrypoint for the kjvonly operator tools.
//
// Provides subcommands for managing token keys, logging in, sending raw
// calls to any gateway route, and running Bible searches.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::call::CallCmd;
use commands::keys::KeysCmd;
use commands::login::LoginCmd;
use commands::search::SearchCmd;

/// kjvonly CLI: operator tools for the kjvonly gateway.
#[derive(Parser, Debug)]
#[command(name = "kjvonly", version = "0.1.0", about = "kjvonly gateway CLI")]
struct Cli {
    /// Base URL of the kjvonly gateway.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Token key management: generate, retire, list, hash-password.
    #[command(subcommand)]
    Keys(KeysCmd),

    /// Authenticate and print a session token.
    Login(LoginCmd),

    /// Send a JSON request to a `Service.Method` route.
    Call(CallCmd),

    /// Run a Bible search query.
    Search(SearchCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Keys(cmd) => commands::keys::run(cmd).await?,
        Commands::Login(cmd) => commands::login::run(&cli.rpc, cmd).await?,
        Commands::Call(cmd) => commands::call::run(&cli.rpc, cmd).await?,
        Commands::Search(cmd) => commands::search::run(&cli.rpc, cmd).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_rpc_after_subcommand() {
        let cli = Cli::parse_from([
            "kjvonly",
            "call",
            "UserService.QueryUser",
            "--token",
            "t",
            "--rpc",
            "http://gw:9000",
        ]);
        assert_eq!(cli.rpc, "http://gw:9000");
        match cli.command {
            Commands::Call(cmd) => {
                assert_eq!(cmd.route, "UserService.QueryUser");
                assert_eq!(cmd.data, "{}");
                assert_eq!(cmd.token.as_deref(), Some("t"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn keys_generate_defaults() {
        let cli = Cli::parse_from(["kjvonly", "keys", "generate"]);
        match cli.command {
            Commands::Keys(KeysCmd::Generate { dir, kid }) => {
                assert_eq!(dir, "~/.kjvonly/keys");
                assert!(kid.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
