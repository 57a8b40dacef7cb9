//! Twitter REST API client.
//!
//! [`ApiClient`] issues single signed requests against the v1.1 endpoints.
//! [`TwitterClient`] layers the paginated convenience calls on top of it.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::{
    auth::{Authenticator, Session, percent_encode},
    config::{RateLimitInfo, TwitterConfig},
    cursor::{self, CursorPage},
    error::{TwitterError, TwitterResult},
    types::{ApiErrorBody, Tweet, User, UserCursorPage},
};

const USER_TIMELINE: &str = "/1.1/statuses/user_timeline.json";
const HOME_TIMELINE: &str = "/1.1/statuses/home_timeline.json";
const FRIENDS_LIST: &str = "/1.1/friends/list.json";

/// Query parameters shared by the timeline endpoints.
#[derive(Debug, Clone, Default)]
pub struct TimelineParams {
    /// Whose timeline; `None` means the authenticated account
    pub screen_name: Option<String>,

    /// Page size (the API caps this at 200)
    pub count: Option<usize>,

    /// Only return tweets with an id at or below this one
    pub max_id: Option<u64>,

    /// `Some(false)` drops retweets server-side
    pub include_rts: Option<bool>,

    /// Request untruncated `full_text`
    pub extended: bool,
}

impl TimelineParams {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ref name) = self.screen_name {
            params.push(("screen_name".to_string(), name.clone()));
        }
        if let Some(count) = self.count {
            params.push(("count".to_string(), count.to_string()));
        }
        if let Some(max_id) = self.max_id {
            params.push(("max_id".to_string(), max_id.to_string()));
        }
        if let Some(include_rts) = self.include_rts {
            params.push(("include_rts".to_string(), include_rts.to_string()));
        }
        if self.extended {
            params.push(("tweet_mode".to_string(), "extended".to_string()));
        }
        params
    }
}

/// Signed access to single pages of the REST API.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a new API client from configuration. Does not contact the API.
    pub fn new(config: &TwitterConfig) -> TwitterResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("twitter-harvest/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session: Authenticator::new(config.credentials.clone()).authenticate(),
        })
    }

    /// Make a signed GET request with query parameters.
    #[instrument(skip(self, params))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> TwitterResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint, params = params.len(), "Making Twitter API request");

        let full_url = if params.is_empty() {
            url.clone()
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            format!("{url}?{query}")
        };

        let auth_header = self.session.sign("GET", &url, params)?;

        let response = self
            .client
            .get(&full_url)
            .header("Authorization", auth_header)
            .send()
            .await?;

        handle_response(response).await
    }

    /// One page of a user's timeline.
    pub async fn user_timeline(&self, params: &TimelineParams) -> TwitterResult<Vec<Tweet>> {
        self.get(USER_TIMELINE, &params.to_query()).await
    }

    /// One page of the authenticated account's home timeline.
    pub async fn home_timeline(&self, params: &TimelineParams) -> TwitterResult<Vec<Tweet>> {
        self.get(HOME_TIMELINE, &params.to_query()).await
    }

    /// One page of the accounts `screen_name` follows.
    pub async fn friends_list(
        &self,
        screen_name: Option<&str>,
        cursor: i64,
        count: usize,
    ) -> TwitterResult<UserCursorPage> {
        let mut params = Vec::new();
        if let Some(name) = screen_name {
            params.push(("screen_name".to_string(), name.to_string()));
        }
        params.push(("cursor".to_string(), cursor.to_string()));
        params.push(("count".to_string(), count.to_string()));
        params.push(("skip_status".to_string(), "true".to_string()));
        params.push(("include_user_entities".to_string(), "false".to_string()));

        self.get(FRIENDS_LIST, &params).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> TwitterResult<T> {
    let status = response.status();
    let rate_limit = RateLimitInfo::from_headers(response.headers());

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(remaining = ?rate_limit.remaining, reset = ?rate_limit.reset, "Rate limited");
        return Err(TwitterError::RateLimited {
            retry_after: rate_limit.secs_until_reset().unwrap_or(0),
        });
    }

    if let Some(remaining) = rate_limit.remaining {
        debug!(remaining, "Rate limit window");
    }

    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(TwitterError::from);
    }

    Err(api_error(status.as_u16(), &bytes))
}

/// Decode a v1.1 error body, falling back to the raw text.
pub(crate) fn api_error(status: u16, body: &[u8]) -> TwitterError {
    let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let first = parsed.errors.first();

    let message = first
        .and_then(|e| e.message.clone())
        .or(parsed.error)
        .unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(body).trim().to_string();
            if raw.is_empty() {
                "Unknown error".to_string()
            } else {
                raw
            }
        });

    TwitterError::Api {
        status,
        message,
        error_code: first.and_then(|e| e.code),
    }
}

/// Convenience client bound to one target account.
#[derive(Debug)]
pub struct TwitterClient {
    api: ApiClient,
    target_user: Option<String>,
}

impl TwitterClient {
    /// Build a client for `target_user` (or the authenticated account when
    /// `None`). Credentials are not checked until the first call.
    pub fn new(config: &TwitterConfig, target_user: Option<String>) -> TwitterResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            target_user,
        })
    }

    /// The underlying single-page client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn target_user(&self) -> Option<&str> {
        self.target_user.as_deref()
    }

    /// Text of up to `count` of the target user's own tweets, retweets excluded.
    #[instrument(skip(self), fields(user = ?self.target_user))]
    pub async fn fetch_user_timeline(&self, count: usize) -> TwitterResult<Vec<String>> {
        let tweets = self
            .paginate_user_timeline(count, false, Some(false))
            .await?;
        Ok(tweets.iter().map(|t| t.full_text().to_string()).collect())
    }

    /// Up to `count` full tweet records from the target user's timeline.
    ///
    /// `include_rts` is left to the API default, so retweets are kept.
    #[instrument(skip(self), fields(user = ?self.target_user))]
    pub async fn fetch_user_timeline_records(&self, count: usize) -> TwitterResult<Vec<Tweet>> {
        self.paginate_user_timeline(count, true, None).await
    }

    /// Up to `count` accounts the target user follows.
    #[instrument(skip(self), fields(user = ?self.target_user))]
    pub async fn fetch_friends(&self, count: usize) -> TwitterResult<Vec<User>> {
        let screen_name = self.target_user();

        cursor::paginate_cursor(count, |cursor, size| async move {
            let page = self.api.friends_list(screen_name, cursor, size).await?;
            Ok(CursorPage {
                items: page.users,
                next_cursor: page.next_cursor,
            })
        })
        .await
    }

    /// Up to `count` tweets from the authenticated account's home feed.
    #[instrument(skip(self))]
    pub async fn fetch_home_timeline(&self, count: usize) -> TwitterResult<Vec<Tweet>> {
        cursor::paginate_max_id(
            count,
            |max_id, size| async move {
                let params = TimelineParams {
                    count: Some(size),
                    max_id,
                    extended: true,
                    ..TimelineParams::default()
                };
                self.api.home_timeline(&params).await
            },
            |tweet| tweet.id,
        )
        .await
    }

    async fn paginate_user_timeline(
        &self,
        count: usize,
        extended: bool,
        include_rts: Option<bool>,
    ) -> TwitterResult<Vec<Tweet>> {
        cursor::paginate_max_id(
            count,
            |max_id, size| async move {
                let params = TimelineParams {
                    screen_name: self.target_user().map(str::to_string),
                    count: Some(size),
                    max_id,
                    include_rts,
                    extended,
                };
                self.api.user_timeline(&params).await
            },
            |tweet| tweet.id,
        )
        .await
    }
}
