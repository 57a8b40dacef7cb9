//! Tabulates fetched tweets.
//!
//! [`TweetAnalyzer::tweets_to_table`] is pure: one row per tweet, source order
//! kept, nothing fetched or mutated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Tweet;

/// Timestamp layout used by the v1.1 API, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

const TEXT_PREVIEW_CHARS: usize = 50;

/// Parse a v1.1 `created_at` string.
#[must_use]
pub fn parse_twitter_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One tabulated tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetRow {
    pub text: String,
    pub id: u64,
    pub date: Option<DateTime<Utc>>,
    /// `created_at` exactly as received
    pub date_raw: String,
    /// Character count of `text`
    pub len: usize,
    pub place: Option<String>,
    pub likes: u64,
    pub retweets: u64,
}

impl TweetRow {
    fn from_tweet(tweet: &Tweet) -> Self {
        let text = tweet.full_text().to_string();
        Self {
            len: text.chars().count(),
            text,
            id: tweet.id,
            date: parse_twitter_date(&tweet.created_at),
            date_raw: tweet.created_at.clone(),
            place: tweet.place.as_ref().map(|p| p.full_name.clone()),
            likes: tweet.favorite_count,
            retweets: tweet.retweet_count,
        }
    }
}

/// Rows built once from a batch of tweets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TweetTable {
    rows: Vec<TweetRow>,
}

impl TweetTable {
    #[must_use]
    pub fn rows(&self) -> &[TweetRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Average text length, `None` for an empty table.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_length(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let total: usize = self.rows.iter().map(|r| r.len).sum();
        Some(total as f64 / self.rows.len() as f64)
    }

    #[must_use]
    pub fn max_likes(&self) -> Option<u64> {
        self.rows.iter().map(|r| r.likes).max()
    }

    #[must_use]
    pub fn max_retweets(&self) -> Option<u64> {
        self.rows.iter().map(|r| r.retweets).max()
    }

    /// Likes indexed by date, in row order. Rows without a parseable date are skipped.
    #[must_use]
    pub fn likes_by_date(&self) -> Vec<(DateTime<Utc>, u64)> {
        self.series(|r| r.likes)
    }

    /// Retweets indexed by date, in row order.
    #[must_use]
    pub fn retweets_by_date(&self) -> Vec<(DateTime<Utc>, u64)> {
        self.series(|r| r.retweets)
    }

    fn series(&self, value: impl Fn(&TweetRow) -> u64) -> Vec<(DateTime<Utc>, u64)> {
        self.rows
            .iter()
            .filter_map(|r| r.date.map(|d| (d, value(r))))
            .collect()
    }
}

/// Builds [`TweetTable`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TweetAnalyzer;

impl TweetAnalyzer {
    #[must_use]
    pub fn tweets_to_table(&self, tweets: &[Tweet]) -> TweetTable {
        TweetTable {
            rows: tweets.iter().map(TweetRow::from_tweet).collect(),
        }
    }
}

fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= TEXT_PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(TEXT_PREVIEW_CHARS - 3).collect();
    format!("{cut}...")
}

impl fmt::Display for TweetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEADERS: [&str; 8] = ["", "Tweets", "id", "date", "len", "place", "likes", "retweets"];

        let cells: Vec<[String; 8]> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                [
                    i.to_string(),
                    preview(&r.text),
                    r.id.to_string(),
                    r.date.map_or_else(
                        || r.date_raw.clone(),
                        |d| d.format("%Y-%m-%d %H:%M:%S").to_string(),
                    ),
                    r.len.to_string(),
                    r.place.clone().unwrap_or_else(|| "None".to_string()),
                    r.likes.to_string(),
                    r.retweets.to_string(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(|h| h.chars().count());
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let write_line = |f: &mut fmt::Formatter<'_>, line: &[String]| -> fmt::Result {
            let rendered = line
                .iter()
                .zip(widths)
                .enumerate()
                .map(|(col, (cell, width))| {
                    // Text columns read better left-aligned
                    if col == 1 || col == 3 || col == 5 {
                        format!("{cell:<width$}")
                    } else {
                        format!("{cell:>width$}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", rendered.trim_end())
        };

        write_line(f, HEADERS.map(String::from).as_slice())?;
        for row in &cells {
            write_line(f, row.as_slice())?;
        }
        write!(f, "\n[{} rows x 7 columns]", self.rows.len())
    }
}
