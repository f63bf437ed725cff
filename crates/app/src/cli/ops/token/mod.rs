use clap::{Args, Subcommand};

pub mod create;
pub mod inspect;

use crate::cli::op::Op;

crate::command_enum! {
    (Create, create::Create),
    (Inspect, inspect::Inspect),
}

pub type TokenCommand = Command;

/// Mint and inspect access tokens for machine principals
#[derive(Args, Debug, Clone)]
pub struct Token {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[async_trait::async_trait]
impl Op for Token {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
