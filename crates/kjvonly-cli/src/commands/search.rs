// crates/kjvonly-cli/src/commands/search.rs
//
// `kjvonly search <query>`: run an Elasticsearch SQL query through
// BibleSearchService and print the rows as a table.

use clap::Args;
use serde_json::json;

use crate::output::{format_json, format_sql_table};
use crate::rpc_client::rpc_call;

#[derive(Debug, Args)]
pub struct SearchCmd {
    /// SQL query text, e.g. "SELECT book, chapter, verse FROM kjv LIMIT 5".
    #[arg()]
    pub query: String,

    /// Print the raw JSON response instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Optional session token. Search is public.
    #[arg(long)]
    pub token: Option<String>,
}

/// Run the search command.
pub async fn run(rpc: &str, cmd: &SearchCmd) -> Result<(), Box<dyn std::error::Error>> {
    let body = json!({ "search": { "query": cmd.query } });
    let reply = rpc_call(rpc, "BibleSearchService.Search", &body, cmd.token.as_deref()).await?;

    if cmd.json {
        println!("{}", format_json(&reply));
        return Ok(());
    }
    if let Some(error) = reply["error"].as_str() {
        return Err(format!("search failed: {}", error).into());
    }

    let results = &reply["search_results"];
    let count = results["rows"].as_array().map_or(0, Vec::len);
    println!("{}", format_sql_table(results));
    println!("{} rows", count);
    Ok(())
}
