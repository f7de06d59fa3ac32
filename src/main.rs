use clap::Parser;
use log::{error, info};
use redharvest::cli::{Cli, Commands};
use redharvest::client::{RedditClient, Session};
use redharvest::config::{AppConfig, Credentials, HarvestConfig};
use redharvest::operations::{Harvest, HarvestError, RunOptions};
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let app = AppConfig::load();

    if let Err(err) = run(cli, app).await {
        error!("{}", err);
        process::exit(1);
    }
}

async fn run(cli: Cli, app: AppConfig) -> Result<(), HarvestError> {
    let config = cli.harvest_config(&app)?;
    let harvest = Harvest::new(config)?;

    match &cli.command {
        Commands::Posts { .. } => {
            let mut session = connect(&cli, &app, harvest.config()).await?;
            let result = harvest.fetch_posts(&mut session).await?;
            info!(
                "Wrote {} posts to {}",
                result.posts.len(),
                harvest.output_dir().display()
            );
        }
        Commands::Comments {
            post_ids,
            no_progress,
        } => {
            let mut session = connect(&cli, &app, harvest.config()).await?;
            let (batches, sentinels) = harvest
                .fetch_comments(&mut session, post_ids, !no_progress)
                .await?;
            info!(
                "Wrote {} records in {} batches ({} posts failed)",
                batches.records,
                batches.batches.len(),
                sentinels
            );
        }
        Commands::Run {
            resume,
            no_progress,
            ..
        } => {
            let mut session = connect(&cli, &app, harvest.config()).await?;
            let options = RunOptions {
                resume: *resume,
                show_progress: !no_progress,
            };
            harvest.run(&mut session, options).await?;
        }
        Commands::Combine => {
            let records = harvest.combine()?;
            info!("Combined table holds {} comments", records);
        }
    }
    Ok(())
}

async fn connect(
    cli: &Cli,
    app: &AppConfig,
    config: &HarvestConfig,
) -> Result<Session<RedditClient>, HarvestError> {
    let path = app.credentials_path(cli.credentials.as_deref());
    info!("Loading credentials from {}", path.display());
    let credentials = Credentials::load(&path)?;

    let client = RedditClient::authenticate(&credentials).await?;
    info!("Authenticated with the Reddit API");
    Ok(Session::new(client, &config.throttle, &config.retry))
}
