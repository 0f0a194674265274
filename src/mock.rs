//! In-memory transport for tests and dry runs.

use std::collections::VecDeque;
use std::io;

use tracing::trace;

use crate::error::Result;
use crate::transport::Transport;

/// Records every command and answers queries from a queue of canned replies.
///
/// A query with no reply queued fails with an `UnexpectedEof` I/O error, the
/// same way a silent instrument would surface through a real transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<String>,
    replies: VecDeque<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies, returned in order by subsequent queries.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Vec::new(),
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push_reply(&mut self, reply: impl Into<String>) {
        self.replies.push_back(reply.into());
    }

    /// Everything written so far, queries included, without terminators.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.sent.last().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl Transport for MockTransport {
    fn write(&mut self, command: &str) -> Result<()> {
        trace!(command, "mock write");
        self.sent.push(command.to_string());
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String> {
        self.sent.push(command.to_string());
        let reply = self.replies.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no reply queued for '{command}'"),
            )
        })?;
        trace!(command, reply = %reply, "mock query");
        Ok(reply.trim_end().to_string())
    }
}
