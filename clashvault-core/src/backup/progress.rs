//! Progress reporting and cooperative cancellation.
//!
//! Progress crosses from the worker context to whatever owns UI state as
//! messages on a channel, not as a raw callback. Cancellation is a shared
//! flag the long loops poll between items; mid-item work is never
//! interrupted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{BackupError, Result};

/// A phase boundary inside a backup or restore operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Collecting,
    Encrypting,
    Uploading,
    Fetching,
    Decrypting,
    RestoringSettings,
    RestoringProfile(String),
    RestoringSelections,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting => write!(f, "collecting settings and profiles"),
            Self::Encrypting => write!(f, "encrypting backup data"),
            Self::Uploading => write!(f, "uploading to gist"),
            Self::Fetching => write!(f, "fetching backup"),
            Self::Decrypting => write!(f, "decrypting backup data"),
            Self::RestoringSettings => write!(f, "restoring settings"),
            Self::RestoringProfile(name) => write!(f, "restoring profile: {name}"),
            Self::RestoringSelections => write!(f, "restoring proxy selections"),
        }
    }
}

/// Sending half of the progress channel. A disabled sink drops events.
#[derive(Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<Progress>>,
}

impl ProgressSink {
    /// A sink that discards all events.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub(crate) fn emit(&self, progress: Progress) {
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(progress);
        }
    }
}

/// Shared cancellation flag for long-running operations.
#[derive(Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BackupError::Cancelled)
        } else {
            Ok(())
        }
    }
}
