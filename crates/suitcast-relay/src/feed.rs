use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("malformed feed line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl FeedError {
    /// Malformed lines are skipped; I/O failures end the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FeedError::Malformed { .. })
    }
}

/// One inbound message as recorded by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedEvent {
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub edited: bool,
    /// Receive time; events without one are stamped when processed.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Iterates JSON-lines feed events, skipping blank lines.
pub struct FeedReader<R> {
    lines: Lines<BufReader<R>>,
    line: usize,
}

impl FeedReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|source| FeedError::Io {
            context: "opening feed",
            source,
        })?;
        Ok(Self::new(file))
    }
}

impl<R: Read> FeedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line: 0,
        }
    }
}

impl<R: Read> Iterator for FeedReader<R> {
    type Item = Result<FeedEvent, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(source) => {
                    return Some(Err(FeedError::Io {
                        context: "reading feed",
                        source,
                    }));
                }
            };
            self.line += 1;
            if raw.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&raw).map_err(|source| FeedError::Malformed {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}
