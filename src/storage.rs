//! Persistence for the ledger. The whole state lives in two named slots
//! inside the application directory, `records.json` for the record collection
//! and `tapped_in.json` for the flag. Slots are read once at startup and
//! rewritten after every effective mutation.

use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use crate::ledger::record::DayRecord;

pub const RECORDS_SLOT: &str = "records.json";
pub const TAPPED_IN_SLOT: &str = "tapped_in.json";

/// Interface for abstracting persistence of the ledger.
pub trait LedgerStore {
    /// Reads both slots back. A slot that is absent or holds unparsable data
    /// comes back as its empty default, only real I/O failures surface.
    fn load(&self) -> impl Future<Output = Result<(Vec<DayRecord>, bool)>> + Send;

    /// Writes the whole snapshot out, one slot at a time.
    fn save(
        &self,
        records: &[DayRecord],
        tapped_in: bool,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The main realization of [LedgerStore]. Each slot is its own JSON file.
pub struct JsonLedgerStore {
    data_dir: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self { data_dir })
    }

    async fn read_slot<T: DeserializeOwned + Default>(&self, slot: &str) -> Result<T> {
        let path = self.data_dir.join(slot);
        let payload = match read_locked(&path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&payload) {
            Ok(value) => Ok(value),
            Err(e) => {
                // Might happen after shutdowns cutting off a write.
                warn!("Slot {slot} holds unparsable data, treating it as empty: {e}");
                Ok(T::default())
            }
        }
    }

    async fn write_slot<T: Serialize>(&self, slot: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(slot);
        let payload = serde_json::to_vec_pretty(value)?;
        write_locked(&path, &payload).await?;
        Ok(())
    }
}

impl LedgerStore for JsonLedgerStore {
    async fn load(&self) -> Result<(Vec<DayRecord>, bool)> {
        let records = self.read_slot::<Vec<DayRecord>>(RECORDS_SLOT).await?;
        let tapped_in = self.read_slot::<bool>(TAPPED_IN_SLOT).await?;
        debug!("Loaded {} records, tapped_in {tapped_in}", records.len());
        Ok((records, tapped_in))
    }

    async fn save(&self, records: &[DayRecord], tapped_in: bool) -> Result<()> {
        self.write_slot(RECORDS_SLOT, &records).await?;
        self.write_slot(TAPPED_IN_SLOT, &tapped_in).await?;
        Ok(())
    }
}

async fn read_locked(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    // Semi-safe acquire-release for a file
    file.lock_shared()?;
    let mut payload = String::new();
    let result = file.read_to_string(&mut payload).await;
    file.unlock_async().await?;
    result?;
    Ok(payload)
}

async fn write_locked(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;
    file.lock_exclusive()?;
    // The slot only shrinks while the exclusive lock is held.
    let result = async {
        file.set_len(0).await?;
        file.write_all(payload).await?;
        file.flush().await
    }
    .await;
    file.unlock_async().await?;
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::ledger::record::{DayRecord, RecordId};

    use super::*;

    fn sample_records() -> Vec<DayRecord> {
        vec![
            DayRecord {
                id: RecordId::from("1709280000000"),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                tap_in: "09:00".to_string(),
                tap_out: "17:30".to_string(),
                activities: vec!["Wrote report".into(), "Code review".into()],
            },
            DayRecord {
                id: RecordId::from("1709366400000"),
                date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                tap_in: "08:45".to_string(),
                tap_out: String::new(),
                activities: vec![],
            },
        ]
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;
        let records = sample_records();

        store.save(&records, true).await?;
        let (loaded, tapped_in) = store.load().await?;

        assert_eq!(loaded, records);
        assert!(tapped_in);
        Ok(())
    }

    #[tokio::test]
    async fn missing_slots_load_as_empty_ledger() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;

        let (records, tapped_in) = store.load().await?;

        assert!(records.is_empty());
        assert!(!tapped_in);
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_records_slot_loads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;
        std::fs::write(dir.path().join(RECORDS_SLOT), "{ not json")?;
        std::fs::write(dir.path().join(TAPPED_IN_SLOT), "true")?;

        let (records, tapped_in) = store.load().await?;

        assert!(records.is_empty());
        assert!(tapped_in);
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_flag_slot_loads_as_false() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;
        store.save(&sample_records(), true).await?;
        std::fs::write(dir.path().join(TAPPED_IN_SLOT), "maybe")?;

        let (records, tapped_in) = store.load().await?;

        assert_eq!(records.len(), 2);
        assert!(!tapped_in);
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;
        let records = sample_records();

        store.save(&records, true).await?;
        store.save(&records[..1], false).await?;
        let (loaded, tapped_in) = store.load().await?;

        assert_eq!(loaded, records[..1]);
        assert!(!tapped_in);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn save_does_not_truncate_while_a_reader_holds_the_lock() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonLedgerStore::new(dir.path().to_owned())?;
        let records = sample_records();
        store.save(&records, true).await?;

        let path = dir.path().join(RECORDS_SLOT);
        let reader = File::open(&path).await?;
        reader.lock_shared()?;

        let updated = records[..1].to_vec();
        let saver = tokio::spawn({
            let updated = updated.clone();
            async move { store.save(&updated, false).await }
        });

        // Give the save time to queue on the exclusive lock.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let payload = std::fs::read_to_string(&path)?;
        let parsed: Vec<DayRecord> = serde_json::from_str(&payload)?;
        assert_eq!(parsed, records);

        reader.unlock_async().await?;
        saver.await??;

        let reopened = JsonLedgerStore::new(dir.path().to_owned())?;
        let (loaded, tapped_in) = reopened.load().await?;
        assert_eq!(loaded, updated);
        assert!(!tapped_in);
        Ok(())
    }
}
