//! Callbacks invoked by the filtered stream.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, trace, warn};

use crate::error::TwitterResult;

/// Status the v1.1 streaming API sends when a client connects too often.
pub const STREAM_RATE_LIMIT_STATUS: u16 = 420;

/// Status the REST-style endpoints use for the same condition.
pub const TOO_MANY_REQUESTS_STATUS: u16 = 429;

/// Receives messages from a [`FilteredStream`](crate::stream::FilteredStream).
///
/// Both methods return whether the stream should keep going.
pub trait StreamListener {
    /// Called once per raw message, byte for byte as delivered.
    fn on_data(&mut self, raw: &[u8]) -> bool;

    /// Called when the stream endpoint answers with a non-success status.
    fn on_error(&mut self, status: u16) -> bool;
}

/// Appends every raw payload to a file.
///
/// The file is opened and closed again for each message.
#[derive(Debug, Clone)]
pub struct FileSinkListener {
    path: PathBuf,
    written: u64,
}

impl FileSinkListener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Messages successfully appended so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    fn append(&self, raw: &[u8]) -> TwitterResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(raw)?;
        Ok(())
    }
}

impl StreamListener for FileSinkListener {
    fn on_data(&mut self, raw: &[u8]) -> bool {
        debug!(bytes = raw.len(), "Received stream message");
        trace!(payload = %String::from_utf8_lossy(raw), "Stream payload");

        match self.append(raw) {
            Ok(()) => self.written += 1,
            Err(e) => error!(
                error = %e,
                path = %self.path.display(),
                "Failed to append stream message"
            ),
        }

        true
    }

    fn on_error(&mut self, status: u16) -> bool {
        if status == STREAM_RATE_LIMIT_STATUS || status == TOO_MANY_REQUESTS_STATUS {
            info!(status, "Stream rate limited, stopping");
            return false;
        }

        warn!(status, "Stream returned error status");
        true
    }
}
