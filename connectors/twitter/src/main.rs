//! `twitter-harvest` command-line entrypoint.
//!
//! - `twitter-harvest timeline` - tabulate an account's timeline (default flow)
//! - `twitter-harvest tweets` - print the text of an account's tweets
//! - `twitter-harvest friends` - list the accounts someone follows
//! - `twitter-harvest home` - tabulate the authenticated home timeline
//! - `twitter-harvest stream` - append a filtered live stream to a file

#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use twitter_harvest::{
    TweetAnalyzer, TweetTable, TwitterClient, TwitterConfig, TwitterStreamer,
    app::{self, DEFAULT_FETCH_COUNT, DEFAULT_TARGET_USER},
};

/// Fetch and tabulate Twitter/X timelines, friends and filtered streams.
#[derive(Parser)]
#[command(name = "twitter-harvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Credentials and endpoints. Flags win over the config file.
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// TOML file with a `[credentials]` table and optional endpoints.
    #[arg(long, global = true, env = "TWITTER_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "TWITTER_CONSUMER_KEY", hide_env_values = true)]
    consumer_key: Option<String>,

    #[arg(long, global = true, env = "TWITTER_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: Option<String>,

    #[arg(long, global = true, env = "TWITTER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, global = true, env = "TWITTER_ACCESS_SECRET", hide_env_values = true)]
    access_secret: Option<String>,

    /// REST API base URL.
    #[arg(long, global = true, env = "TWITTER_API_URL")]
    api_url: Option<String>,

    /// Streaming API base URL.
    #[arg(long, global = true, env = "TWITTER_STREAM_URL")]
    stream_url: Option<String>,
}

impl ConnectionArgs {
    fn into_config(self) -> Result<TwitterConfig> {
        let mut config = match self.config {
            Some(path) => TwitterConfig::load(&path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TwitterConfig::default(),
        };

        let creds = &mut config.credentials;
        for (slot, flag) in [
            (&mut creds.consumer_key, self.consumer_key),
            (&mut creds.consumer_secret, self.consumer_secret),
            (&mut creds.access_token, self.access_token),
            (&mut creds.access_token_secret, self.access_secret),
        ] {
            if let Some(value) = flag {
                *slot = value;
            }
        }
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if let Some(url) = self.stream_url {
            config.stream_url = url;
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Tabulate an account's own tweets (retweets excluded).
    Timeline {
        #[arg(long, short = 'u', default_value = DEFAULT_TARGET_USER)]
        user: String,

        #[arg(long, short = 'n', default_value_t = DEFAULT_FETCH_COUNT)]
        count: usize,

        /// Output JSON instead of a text table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print mean length and top engagement after the table.
        #[arg(long, default_value_t = false)]
        stats: bool,
    },

    /// Print the text of an account's own tweets, one per line.
    Tweets {
        #[arg(long, short = 'u', default_value = DEFAULT_TARGET_USER)]
        user: String,

        #[arg(long, short = 'n', default_value_t = DEFAULT_FETCH_COUNT)]
        count: usize,
    },

    /// List accounts someone follows (the authenticated account by default).
    Friends {
        #[arg(long, short = 'u')]
        user: Option<String>,

        #[arg(long, short = 'n', default_value_t = DEFAULT_FETCH_COUNT)]
        count: usize,
    },

    /// Tabulate the authenticated account's home timeline.
    Home {
        #[arg(long, short = 'n', default_value_t = DEFAULT_FETCH_COUNT)]
        count: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Append every tweet matching the keywords to a file until stopped.
    Stream {
        /// Sink file; created if missing, appended to otherwise.
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Keywords to track.
        #[arg(long, short = 't', required = true, num_args = 1..)]
        track: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for tables and JSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.connection.into_config()?;

    match cli.command {
        Commands::Timeline {
            user,
            count,
            json,
            stats,
        } => {
            let table = app::run_timeline(&config, &user, count)
                .await
                .with_context(|| format!("fetching timeline of @{user}"))?;
            print_table(&table, json)?;
            if stats && !json {
                print_stats(&table);
            }
        }
        Commands::Tweets { user, count } => {
            let client = TwitterClient::new(&config, Some(user.clone()))?;
            let texts = client
                .fetch_user_timeline(count)
                .await
                .with_context(|| format!("fetching tweets of @{user}"))?;
            for text in texts {
                println!("{text}");
            }
        }
        Commands::Friends { user, count } => {
            let client = TwitterClient::new(&config, user)?;
            let friends = client
                .fetch_friends(count)
                .await
                .context("fetching friends")?;
            for friend in friends {
                println!("@{}\t{}", friend.screen_name, friend.name);
            }
        }
        Commands::Home { count, json } => {
            let client = TwitterClient::new(&config, None)?;
            let tweets = client
                .fetch_home_timeline(count)
                .await
                .context("fetching home timeline")?;
            print_table(&TweetAnalyzer.tweets_to_table(&tweets), json)?;
        }
        Commands::Stream { output, track } => {
            let streamer = TwitterStreamer::new(config);
            tokio::select! {
                result = streamer.stream_tweets(&output, &track) => {
                    let written = result.context("streaming tweets")?;
                    tracing::info!(written, output = %output.display(), "Stream ended");
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, closing stream");
                }
            }
        }
    }

    Ok(())
}

fn print_table(table: &TweetTable, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
    } else {
        println!("{table}");
    }
    Ok(())
}

fn print_stats(table: &TweetTable) {
    if let Some(mean) = table.mean_length() {
        println!("mean length: {mean:.2}");
    }
    if let Some(likes) = table.max_likes() {
        println!("max likes: {likes}");
    }
    if let Some(retweets) = table.max_retweets() {
        println!("max retweets: {retweets}");
    }
}
