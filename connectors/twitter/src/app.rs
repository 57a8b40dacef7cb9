//! The default harvest: fetch one account's timeline and tabulate it.

use tracing::info;

use crate::{
    analyzer::{TweetAnalyzer, TweetTable},
    client::TwitterClient,
    config::TwitterConfig,
    error::TwitterResult,
};

/// Account harvested when none is given on the command line.
pub const DEFAULT_TARGET_USER: &str = "_saintcharles_";

/// Tweets fetched when no count is given (one full API page).
pub const DEFAULT_FETCH_COUNT: usize = 200;

/// Fetch up to `count` of `target_user`'s tweets and build the table.
pub async fn run_timeline(
    config: &TwitterConfig,
    target_user: &str,
    count: usize,
) -> TwitterResult<TweetTable> {
    let client = TwitterClient::new(config, Some(target_user.to_string()))?;
    let tweets = client.fetch_user_timeline_records(count).await?;
    info!(
        user = target_user,
        fetched = tweets.len(),
        retweets = tweets.iter().filter(|t| t.is_retweet()).count(),
        "Fetched timeline"
    );

    Ok(TweetAnalyzer.tweets_to_table(&tweets))
}
