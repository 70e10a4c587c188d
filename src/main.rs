use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gator::app::AppContext;
use gator::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays free for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::new(cli.config, cli.db)?;

    match cli.command {
        Commands::Register { name } => {
            commands::register(&mut ctx, &name)?;
        }
        Commands::Login { name } => {
            commands::login(&mut ctx, &name)?;
        }
        Commands::Reset => {
            commands::reset(&ctx)?;
        }
        Commands::Users => {
            commands::list_users(&ctx)?;
        }
        Commands::Agg { time_between_reqs } => {
            commands::aggregate(Arc::new(ctx), &time_between_reqs).await?;
        }
        Commands::Addfeed { name, url } => {
            commands::add_feed(&ctx, &name, &url)?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Follow { url } => {
            commands::follow(&ctx, &url)?;
        }
        Commands::Following => {
            commands::following(&ctx)?;
        }
        Commands::Unfollow { url } => {
            commands::unfollow(&ctx, &url)?;
        }
        Commands::Browse { limit } => {
            commands::browse(&ctx, limit)?;
        }
    }

    Ok(())
}
