// crates/kjvonly-cli/src/commands/keys.rs
//
// `kjvonly keys {generate, retire, list, hash-password}`: token key and
// password tooling for operators.
//
// Key files live in one directory: `<kid>.key` holds a hex Ed25519 secret,
// `<kid>.pub` a hex public key for a retired kid.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Subcommand;
use tabled::Tabled;

use kjvonly_auth::{derive_kid, generate_signing_key, hash_password, retire_key_file, write_key_file};

use crate::output::format_table;

/// Key management subcommands.
#[derive(Debug, Subcommand)]
pub enum KeysCmd {
    /// Generate a new signing key.
    Generate {
        /// Key directory.
        #[arg(long, default_value = "~/.kjvonly/keys")]
        dir: String,
        /// Key id; derived from today's date and the public key when omitted.
        #[arg(long)]
        kid: Option<String>,
    },
    /// Drop a key's secret, keeping its public half so issued tokens still
    /// verify.
    Retire {
        #[arg(long, default_value = "~/.kjvonly/keys")]
        dir: String,
        #[arg(long)]
        kid: String,
    },
    /// List the keys in a directory.
    List {
        #[arg(long, default_value = "~/.kjvonly/keys")]
        dir: String,
    },
    /// Hash a password for a seed file. Reads one line from stdin.
    HashPassword,
}

/// A row in the key listing table.
#[derive(Debug, Tabled, PartialEq, Eq)]
struct KeyRow {
    #[tabled(rename = "Kid")]
    kid: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

/// Run the keys subcommand.
pub async fn run(cmd: &KeysCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        KeysCmd::Generate { dir, kid } => {
            let dir = expand_tilde(dir);
            let (kid, path) = generate(&dir, kid.as_deref())?;
            println!("Generated signing key {}", kid);
            println!("  Saved to: {}", path.display());
            println!();
            println!("Restart the gateway to start signing with it.");
        }
        KeysCmd::Retire { dir, kid } => {
            let path = retire_key_file(expand_tilde(dir), kid)?;
            println!("Retired key {}", kid);
            println!("  Public key kept at: {}", path.display());
        }
        KeysCmd::List { dir } => {
            let rows = list(&expand_tilde(dir))?;
            if rows.is_empty() {
                println!("No keys found.");
            } else {
                println!("{}", format_table(&rows));
            }
        }
        KeysCmd::HashPassword => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            let hash = tokio::task::spawn_blocking({
                let password = password.to_string();
                move || hash_password(&password)
            })
            .await??;
            println!("{}", hash);
        }
    }
    Ok(())
}

fn generate(dir: &Path, kid: Option<&str>) -> Result<(String, PathBuf), Box<dyn std::error::Error>> {
    let key = generate_signing_key();
    let kid = match kid {
        Some(kid) => kid.to_string(),
        None => derive_kid(Utc::now(), &key.verifying_key()),
    };
    let path = write_key_file(dir, &kid, &key)?;
    Ok((kid, path))
}

fn list(dir: &Path) -> Result<Vec<KeyRow>, Box<dyn std::error::Error>> {
    let mut rows = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let status = match path.extension().and_then(|e| e.to_str()) {
            Some("key") => "signing",
            Some("pub") => "retired",
            _ => continue,
        };
        if let Some(kid) = path.file_stem().and_then(|s| s.to_str()) {
            rows.push(KeyRow {
                kid: kid.to_string(),
                status,
            });
        }
    }
    rows.sort_by(|a, b| b.kid.cmp(&a.kid));
    Ok(rows)
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
