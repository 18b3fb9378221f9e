use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode outbox record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Egress transport for announcements.
pub trait Outbox {
    /// Delivers a new message and returns its handle.
    fn send(&mut self, chat_id: i64, text: &str) -> Result<u64, OutboxError>;

    fn edit(&mut self, chat_id: i64, message_id: u64, text: &str) -> Result<(), OutboxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxOp {
    Send,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub op: OutboxOp,
    pub chat_id: i64,
    pub message_id: u64,
    pub text: String,
}

/// Appends every send/edit as a JSON line. Message ids continue after the
/// highest id already present in the file.
pub struct JsonlOutbox {
    path: PathBuf,
    file: File,
    next_id: u64,
}

impl JsonlOutbox {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, OutboxError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| OutboxError::Io {
                context: "creating outbox directory",
                source,
            })?;
        }
        let next_id = highest_message_id(&path)? + 1;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| OutboxError::Io {
                context: "opening outbox",
                source,
            })?;
        Ok(Self {
            path,
            file,
            next_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &OutboxRecord) -> Result<(), OutboxError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| OutboxError::Io {
                context: "writing outbox record",
                source,
            })
    }
}

impl Outbox for JsonlOutbox {
    fn send(&mut self, chat_id: i64, text: &str) -> Result<u64, OutboxError> {
        let message_id = self.next_id;
        self.append(&OutboxRecord {
            op: OutboxOp::Send,
            chat_id,
            message_id,
            text: text.to_string(),
        })?;
        self.next_id += 1;
        Ok(message_id)
    }

    fn edit(&mut self, chat_id: i64, message_id: u64, text: &str) -> Result<(), OutboxError> {
        self.append(&OutboxRecord {
            op: OutboxOp::Edit,
            chat_id,
            message_id,
            text: text.to_string(),
        })
    }
}

fn highest_message_id(path: &Path) -> Result<u64, OutboxError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(OutboxError::Io {
                context: "reading existing outbox",
                source,
            });
        }
    };

    let mut highest = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| OutboxError::Io {
            context: "reading existing outbox",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<OutboxRecord>(&line) {
            Ok(record) => highest = highest.max(record.message_id),
            Err(err) => event!(
                target: "suitcast_relay::outbox",
                Level::WARN,
                error = %err,
                "ignoring unreadable outbox line"
            ),
        }
    }
    Ok(highest)
}

/// Reads back every record; used by the status command and tests.
pub fn read_records(path: &Path) -> Result<Vec<OutboxRecord>, OutboxError> {
    let file = File::open(path).map_err(|source| OutboxError::Io {
        context: "opening outbox",
        source,
    })?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| OutboxError::Io {
            context: "reading outbox",
            source,
        })?;
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}
