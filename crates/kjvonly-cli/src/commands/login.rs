// crates/kjvonly-cli/src/commands/login.rs
//
// `kjvonly login`: authenticate against UserService and print the session
// token.

use clap::Args;
use serde_json::json;

use crate::rpc_client::rpc_call;

#[derive(Debug, Args)]
pub struct LoginCmd {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,
}

/// Run the login command. Prints only the token so it can be captured by
/// a shell.
pub async fn run(rpc: &str, cmd: &LoginCmd) -> Result<(), Box<dyn std::error::Error>> {
    let body = json!({ "username": cmd.username, "password": cmd.password });
    let reply = rpc_call(rpc, "UserService.Authenticate", &body, None).await?;

    if let Some(error) = reply["error"].as_str() {
        return Err(format!("login failed: {}", error).into());
    }
    match reply["token"].as_str() {
        Some(token) => {
            println!("{}", token);
            Ok(())
        }
        None => Err("login failed: no token in response".into()),
    }
}
