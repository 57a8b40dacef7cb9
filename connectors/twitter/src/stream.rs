//! Twitter filtered stream client.
//!
//! Opens one long-lived POST to the v1.1 `statuses/filter` endpoint and hands
//! every newline-delimited message to a [`StreamListener`]. There is no
//! reconnect: when the connection drops, the stream is over.

use std::path::Path;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{Authenticator, Session, percent_encode},
    client::api_error,
    config::TwitterConfig,
    error::TwitterResult,
    listener::{FileSinkListener, StreamListener},
};

const FILTER_ENDPOINT: &str = "/1.1/statuses/filter.json";

/// Why a stream finished without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The listener asked to stop.
    ListenerStopped,

    /// The server closed the connection.
    Closed,
}

/// One filtered stream connection driving a listener.
pub struct FilteredStream<L> {
    client: reqwest::Client,
    url: String,
    session: Session,
    listener: L,
}

impl<L: StreamListener> FilteredStream<L> {
    /// Prepare a stream; nothing is sent until [`filter`](Self::filter).
    pub fn new(config: &TwitterConfig, session: Session, listener: L) -> TwitterResult<Self> {
        // No overall timeout: the response body is meant to stay open
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(format!("twitter-harvest/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}{}",
                config.stream_url.trim_end_matches('/'),
                FILTER_ENDPOINT
            ),
            session,
            listener,
        })
    }

    pub const fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    /// Track `keywords` and block until the listener stops or the
    /// connection ends.
    #[instrument(skip(self))]
    pub async fn filter(&mut self, keywords: &[String]) -> TwitterResult<StreamEnd> {
        let params = vec![("track".to_string(), keywords.join(","))];
        let auth_header = self.session.sign("POST", &self.url, &params)?;
        let body = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        info!(url = %self.url, "Connecting to Twitter filtered stream");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", auth_header)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            if !self.listener.on_error(code) {
                return Ok(StreamEnd::ListenerStopped);
            }
            // The listener wants more, but without reconnects there is no
            // connection left to read from
            let body = response.bytes().await.unwrap_or_default();
            return Err(api_error(code, &body));
        }

        info!("Stream connected");
        self.process(response).await
    }

    async fn process(&mut self, response: reqwest::Response) -> TwitterResult<StreamEnd> {
        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();

        while let Some(chunk_result) = stream.next().await {
            let chunk: Bytes = chunk_result?;
            lines.extend(&chunk);

            while let Some(line) = lines.next_line() {
                if !deliver(&mut self.listener, line) {
                    info!("Listener stopped the stream");
                    return Ok(StreamEnd::ListenerStopped);
                }
            }
        }

        let rest = lines.remainder();
        if !rest.is_empty() && !deliver(&mut self.listener, rest) {
            return Ok(StreamEnd::ListenerStopped);
        }

        warn!("Stream closed by server");
        Ok(StreamEnd::Closed)
    }
}

/// Hand one framed message to the listener; keep-alive lines are skipped.
fn deliver<L: StreamListener>(listener: &mut L, line: &[u8]) -> bool {
    if line.iter().all(u8::is_ascii_whitespace) {
        debug!("Received keep-alive");
        return true;
    }
    listener.on_data(line)
}

/// Newline framing over the received bytes.
///
/// Every byte is scanned once; consumed lines are dropped in one move when
/// the next chunk arrives.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the first undelivered line
    start: usize,
    /// Everything before this index is known to hold no unconsumed newline
    scanned: usize,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, terminator included.
    fn next_line(&mut self) -> Option<&[u8]> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let begin = self.start;
                let end = self.scanned + offset + 1;
                self.start = end;
                self.scanned = end;
                Some(&self.buf[begin..end])
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes after the last complete line.
    fn remainder(&self) -> &[u8] {
        &self.buf[self.start..]
    }
}

/// Streams matching tweets into a file.
#[derive(Debug, Clone)]
pub struct TwitterStreamer {
    config: TwitterConfig,
    authenticator: Authenticator,
}

impl TwitterStreamer {
    #[must_use]
    pub fn new(config: TwitterConfig) -> Self {
        let authenticator = Authenticator::new(config.credentials.clone());
        Self {
            config,
            authenticator,
        }
    }

    /// Append every tweet matching `keywords` to `fetched_tweets_filename`
    /// until the stream stops. Returns how many messages were written.
    pub async fn stream_tweets(
        &self,
        fetched_tweets_filename: impl AsRef<Path>,
        keywords: &[String],
    ) -> TwitterResult<u64> {
        let listener = FileSinkListener::new(fetched_tweets_filename.as_ref());
        let session = self.authenticator.authenticate();
        let mut stream = FilteredStream::new(&self.config, session, listener)?;

        let end = stream.filter(keywords).await?;
        let written = stream.listener().written();
        info!(?end, written, "Stream finished");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::TwitterError;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string, header, header_exists, method, path},
    };

    /// Records everything it sees; optionally stops after `stop_after` messages.
    #[derive(Default)]
    struct Recorder {
        data: Vec<String>,
        errors: Vec<u16>,
        stop_after: Option<usize>,
        continue_on_error: bool,
    }

    impl StreamListener for Recorder {
        fn on_data(&mut self, raw: &[u8]) -> bool {
            self.data.push(String::from_utf8_lossy(raw).into_owned());
            self.stop_after.map_or(true, |n| self.data.len() < n)
        }

        fn on_error(&mut self, status: u16) -> bool {
            self.errors.push(status);
            self.continue_on_error
        }
    }

    fn test_config(mock_server: &MockServer) -> TwitterConfig {
        TwitterConfig {
            credentials: Credentials::new("ck", "cs", "at", "as"),
            stream_url: mock_server.uri(),
            ..Default::default()
        }
    }

    fn session() -> Session {
        Authenticator::new(Credentials::new("ck", "cs", "at", "as")).authenticate()
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn delivers_each_line_and_skips_keep_alives() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .and(header_exists("Authorization"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("track=rust%2Cpython"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"id\":1}\r\n\r\n{\"id\":2}\r\n{\"id\":3}"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut stream =
            FilteredStream::new(&test_config(&mock_server), session(), Recorder::default())
                .unwrap();

        let end = stream.filter(&keywords(&["rust", "python"])).await.unwrap();
        assert_eq!(end, StreamEnd::Closed);

        let recorder = stream.into_listener();
        assert_eq!(
            recorder.data,
            vec!["{\"id\":1}\r\n", "{\"id\":2}\r\n", "{\"id\":3}"]
        );
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn listener_can_stop_the_stream() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("a\nb\nc\n"))
            .mount(&mock_server)
            .await;

        let recorder = Recorder {
            stop_after: Some(2),
            ..Recorder::default()
        };
        let mut stream = FilteredStream::new(&test_config(&mock_server), session(), recorder).unwrap();

        let end = stream.filter(&keywords(&["x"])).await.unwrap();
        assert_eq!(end, StreamEnd::ListenerStopped);
        assert_eq!(stream.listener().data, vec!["a\n", "b\n"]);
    }

    #[tokio::test]
    async fn rate_limit_status_stops_gracefully() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .respond_with(ResponseTemplate::new(420).set_body_string("Enhance Your Calm"))
            .mount(&mock_server)
            .await;

        let mut stream = FilteredStream::new(
            &test_config(&mock_server),
            session(),
            FileSinkListener::new("never-written.json"),
        )
        .unwrap();

        let end = stream.filter(&keywords(&["x"])).await.unwrap();
        assert_eq!(end, StreamEnd::ListenerStopped);
        assert_eq!(stream.listener().written(), 0);
    }

    #[tokio::test]
    async fn other_error_status_is_reported_then_returned() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errors": [{"code": 32, "message": "Could not authenticate you."}]
            })))
            .mount(&mock_server)
            .await;

        let recorder = Recorder {
            continue_on_error: true,
            ..Recorder::default()
        };
        let mut stream = FilteredStream::new(&test_config(&mock_server), session(), recorder).unwrap();

        let err = stream.filter(&keywords(&["x"])).await.unwrap_err();
        assert!(matches!(err, TwitterError::Api { status: 401, .. }));
        assert_eq!(stream.listener().errors, vec![401]);
    }

    #[tokio::test]
    async fn streamer_appends_to_sink_file() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .and(body_string("track=bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"id\":1}\r\n{\"id\":2}\r\n"),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("out.json");

        let streamer = TwitterStreamer::new(test_config(&mock_server));
        let written = streamer
            .stream_tweets(&sink, &keywords(&["bitcoin"]))
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(&sink).unwrap(),
            "{\"id\":1}\r\n{\"id\":2}\r\n"
        );
    }

    #[tokio::test]
    async fn unreachable_stream_host_is_an_http_error() {
        let config = TwitterConfig {
            stream_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };

        let streamer = TwitterStreamer::new(config);
        let dir = tempfile::tempdir().unwrap();
        let err = streamer
            .stream_tweets(dir.path().join("out.json"), &keywords(&["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::Http(_)));
    }

    #[tokio::test]
    async fn streamer_writes_non_utf8_bytes_verbatim() {
        let mock_server = MockServer::start().await;
        let body = b"{\"id\":1,\"t\":\"\xff\"}\r\n".to_vec();

        Mock::given(method("POST"))
            .and(path(FILTER_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("out.json");

        let streamer = TwitterStreamer::new(test_config(&mock_server));
        let written = streamer
            .stream_tweets(&sink, &keywords(&["x"]))
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(std::fs::read(&sink).unwrap(), body);
    }

    #[test]
    fn line_buffer_joins_lines_split_across_chunks() {
        let mut lines = LineBuffer::default();

        lines.extend(b"{\"id\"");
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.scanned, 5);

        lines.extend(b":1}\r\n{\"id\":2}\r\n{\"id");
        assert_eq!(lines.next_line(), Some(&b"{\"id\":1}\r\n"[..]));
        assert_eq!(lines.next_line(), Some(&b"{\"id\":2}\r\n"[..]));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.remainder(), b"{\"id");

        lines.extend(b"\":3}\n");
        assert_eq!(lines.start, 0);
        assert_eq!(lines.next_line(), Some(&b"{\"id\":3}\n"[..]));
        assert!(lines.remainder().is_empty());
    }

    #[test]
    fn line_buffer_scans_each_byte_once() {
        let mut lines = LineBuffer::default();
        let chunk = "x\n".repeat(10_000);
        lines.extend(chunk.as_bytes());

        let mut count = 0;
        let mut last_scanned = 0;
        while let Some(line) = lines.next_line() {
            assert_eq!(line, b"x\n");
            count += 1;
            // The scan position only moves forward, one line at a time
            assert_eq!(lines.scanned, last_scanned + 2);
            last_scanned = lines.scanned;
        }

        assert_eq!(count, 10_000);
        assert_eq!(lines.scanned, chunk.len());
    }
}
