use clap::Parser;

use crate::config::ClientConfig;
use crate::editor::Language;

#[derive(Parser)]
#[command(name = "code-battle")]
#[command(version = "1.1.0")]
#[command(about = "A terminal client for the Code Battle competitive coding platform")]
pub struct Args {
    /// Player name for login or registration (prompted when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Player password (prompted when omitted)
    #[arg(long)]
    pub password: Option<String>,

    /// Register a new player instead of logging in
    #[arg(long)]
    pub register: bool,

    /// Backend base URL, overriding the config file and its default
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to the TOML config file
    #[arg(long, default_value = "code-battle.toml")]
    pub config: String,

    /// Language to start the editor in
    #[arg(long, value_enum, default_value = "javascript")]
    pub language: Language,

    /// Join this room immediately after startup
    #[arg(long)]
    pub room: Option<i64>,

    /// Clear the stored session and exit
    #[arg(long)]
    pub logout: bool,
}

/// Pick the effective base URL: the CLI flag wins over whatever the config
/// resolved (file value, env override, or default).
pub fn resolve_base_url(args: &Args, config: &ClientConfig) -> String {
    match &args.api_url {
        Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
        _ => config.base_url.trim_end_matches('/').to_string(),
    }
}
