use clap::Parser;
use opts::{WalletCli, WalletSubcommand};

mod cmd;
mod opts;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = WalletCli::parse();

    match args.cmd {
        WalletSubcommand::Inspect(cmd) => cmd.run().await,
        WalletSubcommand::Upgrade(cmd) => cmd.run().await,
        WalletSubcommand::Recover(cmd) => cmd.run().await,
        WalletSubcommand::Hash(cmd) => cmd.run(),
    }
}
