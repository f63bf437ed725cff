pub use clap::Parser;

use std::path::PathBuf;

/// Environment variable consulted when `--token` is absent
pub const ACCESS_TOKEN_ENV: &str = "ENVIE_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "envie")]
#[command(about = "Share encrypted environment files, one wrapped key per recipient")]
#[command(version)]
pub struct Args {
    /// Path to the envie config directory (defaults to ~/.envie)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Access token whose embedded key replaces the key file
    /// (also read from ENVIE_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}

impl Args {
    /// The explicit token, falling back to the environment
    pub fn access_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|token| !token.trim().is_empty())
    }
}
