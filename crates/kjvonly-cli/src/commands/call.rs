// crates/kjvonly-cli/src/commands/call.rs
//
// `kjvonly call <Service.Method>`: send a raw JSON request to any route and
// print the response.

use clap::Args;
use serde_json::Value;

use crate::output::format_json;
use crate::rpc_client::rpc_call;

#[derive(Debug, Args)]
pub struct CallCmd {
    /// Route in `Service.Method` form, e.g. `UserService.QueryUser`.
    #[arg()]
    pub route: String,

    /// JSON request body.
    #[arg(long, default_value = "{}")]
    pub data: String,

    /// Session token from `kjvonly login`.
    #[arg(long)]
    pub token: Option<String>,
}

/// Run the call command.
pub async fn run(rpc: &str, cmd: &CallCmd) -> Result<(), Box<dyn std::error::Error>> {
    if !is_route(&cmd.route) {
        return Err(format!("route must look like Service.Method, got {:?}", cmd.route).into());
    }
    let body: Value =
        serde_json::from_str(&cmd.data).map_err(|e| format!("--data is not valid JSON: {}", e))?;

    let reply = rpc_call(rpc, &cmd.route, &body, cmd.token.as_deref()).await?;
    println!("{}", format_json(&reply));
    Ok(())
}

fn is_route(route: &str) -> bool {
    match route.split_once('.') {
        Some((service, method)) => {
            let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            valid(service) && valid(method)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_shape() {
        assert!(is_route("UserService.QueryUserByEmail"));
        assert!(is_route("Bible_Search.Search"));
        assert!(!is_route("UserService"));
        assert!(!is_route("UserService."));
        assert!(!is_route("a.b.c"));
        assert!(!is_route("User Service.Query"));
    }
}
