//! Twitter/X harvester.
//!
//! Fetches timelines, friends and live filtered streams through the v1.1 API
//! and tabulates fetched tweets.
//!
//! - [`Authenticator`] turns four static secrets into a signing [`Session`]
//! - [`TwitterClient`] pages through user timelines, friends and the home feed
//! - [`TwitterStreamer`] appends a filtered stream to a file via a [`StreamListener`]
//! - [`TweetAnalyzer`] builds a [`TweetTable`] from fetched tweets

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod analyzer;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod listener;
pub mod stream;
pub mod types;

pub use analyzer::{TweetAnalyzer, TweetRow, TweetTable};
pub use auth::{Authenticator, Session};
pub use client::{ApiClient, TimelineParams, TwitterClient};
pub use config::{Credentials, TwitterConfig};
pub use error::{TwitterError, TwitterResult};
pub use listener::{FileSinkListener, StreamListener};
pub use stream::{FilteredStream, StreamEnd, TwitterStreamer};
pub use types::{Place, Tweet, User};
