mod cli;
mod logging;
mod state;
mod version;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Decrypt, Encrypt, Grant, Init, Pubkey, Revoke, Sign, Token, Version};
use state::{AppState, DEFAULT_LOG_LEVEL};

command_enum! {
    (Init, Init),
    (Pubkey, Pubkey),
    (Encrypt, Encrypt),
    (Decrypt, Decrypt),
    (Grant, Grant),
    (Revoke, Revoke),
    (Token, Token),
    (Sign, Sign),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Missing state is fine here; commands that need a key report it
    let state = match AppState::load_if_present(args.config_path.clone()) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = state
        .as_ref()
        .map(|state| state.config.log_level.as_str())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    logging::init_logging(log_level);

    let token = args.access_token();
    let ctx = match cli::op::OpContext::new(args.config_path, state.as_ref(), token.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
