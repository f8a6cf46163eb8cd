//! In-memory attendance state. The [Ledger] owns the ordered day-records and
//! the "currently tapped in" flag, and every state change the application can
//! make goes through one of its operations. Callers decide when to persist,
//! using the boolean each operation returns to tell effective mutations from
//! rejected ones.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;

use crate::utils::{clock::Clock, time::clock_time};

pub mod record;

pub use record::{DayRecord, RecordId};

/// Which time field of a record an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeField {
    /// The tap-in time.
    In,
    /// The tap-out time.
    Out,
}

impl Display for TimeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeField::In => write!(f, "tap-in"),
            TimeField::Out => write!(f, "tap-out"),
        }
    }
}

pub struct Ledger {
    records: Vec<DayRecord>,
    tapped_in: bool,
    clock: Box<dyn Clock>,
}

impl Ledger {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self::from_parts(Vec::new(), false, clock)
    }

    /// Rebuilds the ledger from persisted parts.
    pub fn from_parts(records: Vec<DayRecord>, tapped_in: bool, clock: Box<dyn Clock>) -> Self {
        Self {
            records,
            tapped_in,
            clock,
        }
    }

    /// Swaps the in-memory state for a freshly loaded snapshot. Other
    /// processes write the same slots, so long-lived holders refresh before
    /// acting on what they hold.
    pub fn reload(&mut self, records: Vec<DayRecord>, tapped_in: bool) {
        self.records = records;
        self.tapped_in = tapped_in;
    }

    pub fn records(&self) -> &[DayRecord] {
        &self.records
    }

    pub fn is_tapped_in(&self) -> bool {
        self.tapped_in
    }

    /// Today according to the ledger's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.time().date_naive()
    }

    pub fn record_for(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.records.iter().find(|record| record.date == date)
    }

    pub fn today_record(&self) -> Option<&DayRecord> {
        self.record_for(self.today())
    }

    pub fn can_tap_in(&self) -> bool {
        self.today_record().is_none()
    }

    pub fn can_tap_out(&self) -> bool {
        self.today_record()
            .is_some_and(|record| record.tap_out.is_empty())
    }

    /// Starts today's record at the current time. The existence of a record
    /// for today is the only guard against a double tap-in, so this returns
    /// false exactly when today already has one.
    pub fn tap_in(&mut self) -> bool {
        let now = self.clock.time();
        let today = now.date_naive();
        if self.record_for(today).is_some() {
            return false;
        }
        self.records.push(DayRecord::new(
            RecordId::mint(now.timestamp_millis()),
            today,
            clock_time(now),
        ));
        self.tapped_in = true;
        true
    }

    /// Closes today's record at the current time. Returns false when today
    /// has no record or the record already carries a tap-out.
    pub fn tap_out(&mut self) -> bool {
        let now = self.clock.time();
        let today = now.date_naive();
        let Some(record) = self.records.iter_mut().find(|record| record.date == today) else {
            return false;
        };
        if !record.tap_out.is_empty() {
            return false;
        }
        record.tap_out = clock_time(now);
        self.tapped_in = false;
        true
    }

    /// Appends a note to the record of `date`. Rejected when the text is
    /// blank or the day has no tap-in.
    pub fn add_activity(&mut self, date: NaiveDate, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        match self.records.iter_mut().find(|record| record.date == date) {
            Some(record) if record.has_tap_in() => {
                record.activities.push(text.into());
                true
            }
            _ => false,
        }
    }

    /// Overwrites one time field verbatim. There is no ordering validation,
    /// a tap-out earlier than the tap-in is stored as given, and the tapped-in
    /// flag is left alone.
    pub fn edit_time(&mut self, id: &RecordId, field: TimeField, new_time: &str) -> bool {
        let Some(record) = self.record_mut(id) else {
            return false;
        };
        match field {
            TimeField::In => record.tap_in = new_time.to_string(),
            TimeField::Out => record.tap_out = new_time.to_string(),
        }
        true
    }

    pub fn edit_activity(&mut self, id: &RecordId, index: usize, text: &str) -> bool {
        match self.record_mut(id) {
            Some(record) if index < record.activities.len() => {
                record.activities[index] = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn delete_activity(&mut self, id: &RecordId, index: usize) -> bool {
        match self.record_mut(id) {
            Some(record) if index < record.activities.len() => {
                record.activities.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Removes a record entirely. Deleting today's record clears the
    /// tapped-in flag no matter what its tap-out held.
    pub fn delete_record(&mut self, id: &RecordId) -> bool {
        let Some(position) = self.records.iter().position(|record| &record.id == id) else {
            return false;
        };
        let removed = self.records.remove(position);
        if removed.date == self.today() {
            self.tapped_in = false;
        }
        true
    }

    /// Records matching the optional year and zero-based month, in their
    /// original relative order. No filters means everything.
    pub fn filtered(
        &self,
        year: Option<i32>,
        month0: Option<u32>,
    ) -> impl Iterator<Item = &DayRecord> {
        self.records.iter().filter(move |record| {
            year.map_or(true, |year| record.date.year() == year)
                && month0.map_or(true, |month0| record.date.month0() == month0)
        })
    }

    /// Year and zero-based month pairs that actually hold records, for
    /// browsing history.
    pub fn years_and_months(&self) -> BTreeMap<i32, BTreeSet<u32>> {
        let mut map = BTreeMap::<i32, BTreeSet<u32>>::new();
        for record in &self.records {
            map.entry(record.date.year())
                .or_default()
                .insert(record.date.month0());
        }
        map
    }

    fn record_mut(&mut self, id: &RecordId) -> Option<&mut DayRecord> {
        self.records.iter_mut().find(|record| &record.id == id)
    }
}
