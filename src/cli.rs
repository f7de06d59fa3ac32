use crate::config::{AppConfig, ConfigError, HarvestConfig};
use crate::models::MethodLimit;
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "redharvest",
    version,
    about = "Harvest subreddit posts and their comment threads into JSON Lines tables."
)]
pub struct Cli {
    /// Credentials file with CLIENT_ID, CLIENT_SECRET and USER_AGENT.
    #[arg(long, global = true, help = "Path to the Reddit credentials JSON file")]
    pub credentials: Option<PathBuf>,

    /// Harvest configuration file.
    #[arg(long, global = true, help = "Path to a harvest config JSON file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory the tables are written to")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Comment records per batch file")]
    pub batch_size: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selection of posts, shared by `posts` and `run`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct PostsArgs {
    /// Subreddits to harvest. Replaces the configured list.
    #[arg(long = "subreddit", short, help = "Subreddit name, may be repeated")]
    pub subreddits: Vec<String>,

    /// Listing methods with their limits. Replaces the configured list.
    #[arg(
        long = "method",
        short,
        help = "Listing method and limit as name=limit (hot, new, controversial, rising, top)"
    )]
    pub methods: Vec<MethodLimit>,

    #[arg(long, short, help = "Time window for top: hour, day, week, month, year, all")]
    pub time_filter: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fetch the post table of the configured subreddits.
    Posts {
        #[command(flatten)]
        posts: PostsArgs,
    },

    /// Fetch the comments of the given posts into batch files.
    Comments {
        #[arg(help = "Post ids, without the t3_ prefix", required = true)]
        post_ids: Vec<String>,

        #[arg(long, help = "Do not draw a progress bar")]
        no_progress: bool,
    },

    /// Fetch posts, then their comments, then combine the batches.
    Run {
        #[command(flatten)]
        posts: PostsArgs,

        /// Skip posts an earlier run finished in the output directory.
        #[arg(long, help = "Continue an interrupted run")]
        resume: bool,

        #[arg(long, help = "Do not draw a progress bar")]
        no_progress: bool,
    },

    /// Merge every batch file into the combined comment table.
    Combine,
}

impl Cli {
    /// Build the harvest configuration: config file first, then the
    /// environment, then command-line flags.
    pub fn harvest_config(&self, app: &AppConfig) -> Result<HarvestConfig, ConfigError> {
        let mut config = match self.config.as_ref().or(app.config_path.as_ref()) {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(dir) = &app.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }

        match &self.command {
            Commands::Posts { posts } | Commands::Run { posts, .. } => {
                posts.apply(&mut config);
                if config.normalized_subreddits().is_empty() {
                    return Err(ConfigError::NoSubreddits);
                }
            }
            Commands::Comments { .. } | Commands::Combine => {}
        }
        Ok(config)
    }
}

impl PostsArgs {
    fn apply(&self, config: &mut HarvestConfig) {
        if !self.subreddits.is_empty() {
            config.subreddits = self.subreddits.clone();
        }
        if !self.methods.is_empty() {
            config.methods = self.methods.clone();
        }
        if let Some(filter) = &self.time_filter {
            config.top_time_filter = filter.clone();
        }
    }
}
