use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::types::{Dataset, Source};

/// Wall-clock access, so "today" and "yesterday" can be pinned in tests
pub trait ClockPort: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    fn yesterday(&self) -> NaiveDate {
        self.today() - chrono::Duration::days(1)
    }
}

pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at_noon(day: NaiveDate) -> Self {
        Self(day.and_hms_opt(12, 0, 0).unwrap_or_default())
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// Ingest-side ports

/// Opens authenticated sessions against the remote file endpoint
pub trait FileTransferPort: Send + Sync {
    /// Human-readable endpoint for logs
    fn endpoint(&self) -> String;

    fn open_session(&self) -> Result<Box<dyn FileTransferSession>>;
}

/// One connected, logged-in session
pub trait FileTransferSession {
    fn list_files(&mut self) -> Result<Vec<String>>;

    fn retrieve(&mut self, name: &str) -> Result<Vec<u8>>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// A producer of one whole dataset
pub trait DatasetSource {
    fn source(&self) -> Source;

    fn fetch(&self) -> Result<Dataset>;
}
