//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `attempts` - Payment attempts (key: transaction id)
//! - `indices` - Status/recency index for triage queries
//! - `alerts` - Alert rows (key: transaction id || 0x00 || alert id)
//!
//! Index keys embed a byte-reversed `updated_at` so a forward iteration
//! yields newest-first order without a sort.

use crate::{
    alert::AlertRecord,
    config::LedgerConfig,
    error::{LedgerError, Result},
    types::{AttemptStatus, PaymentAttempt},
};
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;

const CF_ATTEMPTS: &str = "attempts";
const CF_INDICES: &str = "indices";
const CF_ALERTS: &str = "alerts";

// Index key tags
const TAG_STATUS: u8 = 0x01;
const TAG_RECENCY: u8 = 0x02;

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create the database
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ATTEMPTS, Self::cf_options_attempts()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_ALERTS, Self::cf_options_alerts()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = %path.display(), "opened payment ledger storage");

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_attempts() -> Options {
        let mut opts = Options::default();
        // Attempts are frequently read back on upsert, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_alerts() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("column family {name} not found")))
    }

    // Attempt operations

    /// Get an attempt by transaction id
    pub fn get_attempt(&self, transaction_id: &str) -> Result<Option<PaymentAttempt>> {
        let cf = self.cf_handle(CF_ATTEMPTS)?;
        match self.db.get_cf(cf, transaction_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Write an attempt and move its index entries in one atomic batch.
    ///
    /// `previous` must be the stored version being replaced (if any) so its
    /// index entries can be retired in the same batch; partial application
    /// is never observable.
    pub fn put_attempt_indexed(
        &self,
        attempt: &PaymentAttempt,
        previous: Option<&PaymentAttempt>,
    ) -> Result<()> {
        let cf_attempts = self.cf_handle(CF_ATTEMPTS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();

        if let Some(prev) = previous {
            batch.delete_cf(cf_indices, Self::status_key(prev));
            batch.delete_cf(cf_indices, Self::recency_key(prev));
        }

        let value = bincode::serialize(attempt)?;
        batch.put_cf(cf_attempts, attempt.transaction_id.as_bytes(), &value);
        batch.put_cf(cf_indices, Self::status_key(attempt), b"");
        batch.put_cf(cf_indices, Self::recency_key(attempt), b"");

        self.db.write(batch)?;
        Ok(())
    }

    /// Transaction ids with the given status, newest `updated_at` first
    pub fn status_index(&self, status: AttemptStatus) -> Result<Vec<String>> {
        self.scan_index(&[TAG_STATUS, status as u8])
    }

    /// All transaction ids, newest `updated_at` first
    pub fn recency_index(&self) -> Result<Vec<String>> {
        self.scan_index(&[TAG_RECENCY])
    }

    fn scan_index(&self, prefix: &[u8]) -> Result<Vec<String>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let id_offset = prefix.len() + 8;
        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if key.len() > id_offset {
                ids.push(String::from_utf8_lossy(&key[id_offset..]).into_owned());
            }
        }
        Ok(ids)
    }

    fn status_key(attempt: &PaymentAttempt) -> Vec<u8> {
        let mut key = vec![TAG_STATUS, attempt.status as u8];
        key.extend_from_slice(&reverse_timestamp(&attempt.updated_at));
        key.extend_from_slice(attempt.transaction_id.as_bytes());
        key
    }

    fn recency_key(attempt: &PaymentAttempt) -> Vec<u8> {
        let mut key = vec![TAG_RECENCY];
        key.extend_from_slice(&reverse_timestamp(&attempt.updated_at));
        key.extend_from_slice(attempt.transaction_id.as_bytes());
        key
    }

    // Alert operations

    /// Persist an alert row
    pub fn put_alert(&self, alert: &AlertRecord) -> Result<()> {
        let cf = self.cf_handle(CF_ALERTS)?;
        let mut key = alert.transaction_id.as_bytes().to_vec();
        key.push(0x00);
        key.extend_from_slice(alert.id.as_bytes());
        let value = bincode::serialize(alert)?;
        self.db.put_cf(cf, &key, &value)?;
        Ok(())
    }

    /// Alerts referencing one transaction
    pub fn alerts_for(&self, transaction_id: &str) -> Result<Vec<AlertRecord>> {
        let cf = self.cf_handle(CF_ALERTS)?;
        let mut prefix = transaction_id.as_bytes().to_vec();
        prefix.push(0x00);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut alerts = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            alerts.push(bincode::deserialize(&value)?);
        }
        Ok(alerts)
    }

    /// All alert rows
    pub fn list_alerts(&self) -> Result<Vec<AlertRecord>> {
        let cf = self.cf_handle(CF_ALERTS)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::Start);

        let mut alerts = Vec::new();
        for item in iter {
            let (_, value) = item?;
            alerts.push(bincode::deserialize(&value)?);
        }
        Ok(alerts)
    }
}

/// Byte-reversed timestamp so forward iteration is newest-first
fn reverse_timestamp(ts: &DateTime<Utc>) -> [u8; 8] {
    let nanos = ts.timestamp_nanos_opt().unwrap_or(0);
    ((i64::MAX - nanos) as u64).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = LedgerConfig::at(temp_dir.path());
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_attempt(transaction_id: &str, status: AttemptStatus) -> PaymentAttempt {
        let now = Utc::now();
        PaymentAttempt {
            transaction_id: transaction_id.to_string(),
            status,
            amount_cents: 500,
            auth_code: None,
            card_last4: None,
            card_brand: None,
            terminal_id: None,
            reason: None,
            station_id: None,
            location_id: None,
            user_id: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_put_and_get_attempt() {
        let (storage, _temp) = test_storage();
        let attempt = test_attempt("tx-1", AttemptStatus::Sent);

        storage.put_attempt_indexed(&attempt, None).unwrap();

        let stored = storage.get_attempt("tx-1").unwrap().unwrap();
        assert_eq!(stored, attempt);
        assert!(storage.get_attempt("tx-missing").unwrap().is_none());
    }

    #[test]
    fn test_status_index_moves_with_attempt() {
        let (storage, _temp) = test_storage();
        let sent = test_attempt("tx-1", AttemptStatus::Sent);
        storage.put_attempt_indexed(&sent, None).unwrap();

        assert_eq!(storage.status_index(AttemptStatus::Sent).unwrap(), ["tx-1"]);

        let mut approved = sent.clone();
        approved.status = AttemptStatus::Approved;
        approved.updated_at = sent.updated_at + Duration::milliseconds(5);
        storage.put_attempt_indexed(&approved, Some(&sent)).unwrap();

        assert!(storage.status_index(AttemptStatus::Sent).unwrap().is_empty());
        assert_eq!(
            storage.status_index(AttemptStatus::Approved).unwrap(),
            ["tx-1"]
        );
    }

    #[test]
    fn test_indices_are_newest_first() {
        let (storage, _temp) = test_storage();
        let base = Utc::now();
        for (i, id) in ["tx-a", "tx-b", "tx-c"].iter().enumerate() {
            let mut attempt = test_attempt(id, AttemptStatus::Unknown);
            attempt.created_at = base + Duration::milliseconds(i as i64 * 10);
            attempt.updated_at = attempt.created_at;
            storage.put_attempt_indexed(&attempt, None).unwrap();
        }

        assert_eq!(
            storage.status_index(AttemptStatus::Unknown).unwrap(),
            ["tx-c", "tx-b", "tx-a"]
        );
        assert_eq!(
            storage.recency_index().unwrap(),
            ["tx-c", "tx-b", "tx-a"]
        );
    }

    #[test]
    fn test_alert_rows_by_transaction() {
        let (storage, _temp) = test_storage();
        let alert = AlertRecord::unresolved("t9", Some("TRANSPORT_TIMEOUT"));
        storage.put_alert(&alert).unwrap();
        storage
            .put_alert(&AlertRecord::unresolved("t10", None))
            .unwrap();

        let for_t9 = storage.alerts_for("t9").unwrap();
        assert_eq!(for_t9.len(), 1);
        assert_eq!(for_t9[0], alert);
        assert_eq!(storage.list_alerts().unwrap().len(), 2);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let config = LedgerConfig::at(temp_dir.path());
        {
            let storage = Storage::open(&config).unwrap();
            storage
                .put_attempt_indexed(&test_attempt("tx-1", AttemptStatus::Approved), None)
                .unwrap();
        }
        let storage = Storage::open(&config).unwrap();
        assert_eq!(
            storage.get_attempt("tx-1").unwrap().unwrap().status,
            AttemptStatus::Approved
        );
    }
}
