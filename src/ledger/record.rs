use std::{fmt::Display, sync::Arc};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a [DayRecord]. Minted once from the clock's epoch
/// milliseconds when the record is created and stable from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Arc<str>);

impl RecordId {
    pub fn mint(epoch_millis: i64) -> Self {
        Self(epoch_millis.to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// One attendance entry. A day gets at most one of these, created by the
/// first tap-in on that date.
///
/// Times are kept as plain display strings. Edits overwrite them verbatim,
/// so a tap-out earlier than the tap-in is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub id: RecordId,
    pub date: NaiveDate,
    pub tap_in: String,
    pub tap_out: String,
    pub activities: Vec<Arc<str>>,
}

impl DayRecord {
    /// The record a tap-in produces, with no tap-out and no activities yet.
    pub fn new(id: RecordId, date: NaiveDate, tap_in: String) -> Self {
        Self {
            id,
            date,
            tap_in,
            tap_out: String::new(),
            activities: Vec::new(),
        }
    }

    pub fn has_tap_in(&self) -> bool {
        !self.tap_in.is_empty()
    }

    /// A record is open while it has a tap-in and no tap-out yet.
    pub fn is_open(&self) -> bool {
        self.has_tap_in() && self.tap_out.is_empty()
    }
}
