//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `users` - Registered users (key: user id)
//! - `bounties` - Bounties, active and ended (key: bounty id)
//! - `participation` - Membership links (key: bounty id || user id)
//! - `settings` - Runtime settings overlay (key: setting name)
//! - `log` - Append-only audit log (key: sequence number)
//! - `meta` - Monotonic id counters
//!
//! Every multi-row mutation goes through a single `WriteBatch`, so a crash
//! between statements cannot leave a balance without its log entry or a
//! participation row without its share award.

use crate::{
    error::{Error, Result},
    types::{Bounty, BountyId, LogEntry, User, UserId},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::atomic::{AtomicU64, Ordering};

/// Column family names
const CF_USERS: &str = "users";
const CF_BOUNTIES: &str = "bounties";
const CF_PARTICIPATION: &str = "participation";
const CF_SETTINGS: &str = "settings";
const CF_LOG: &str = "log";
const CF_META: &str = "meta";

/// Meta keys for the monotonic counters
const META_BOUNTY_SEQ: &[u8] = b"bounty_seq";
const META_LOG_SEQ: &[u8] = b"log_seq";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,

    /// Last assigned bounty id; the next bounty gets `+ 1`
    bounty_seq: AtomicU64,

    /// Last assigned log sequence number
    log_seq: AtomicU64,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_USERS, Self::cf_options_tables()),
            ColumnFamilyDescriptor::new(CF_BOUNTIES, Self::cf_options_tables()),
            ColumnFamilyDescriptor::new(CF_PARTICIPATION, Self::cf_options_participation()),
            ColumnFamilyDescriptor::new(CF_SETTINGS, Self::cf_options_tables()),
            ColumnFamilyDescriptor::new(CF_LOG, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let bounty_seq = Self::read_counter(&db, META_BOUNTY_SEQ)?;
        let log_seq = Self::read_counter(&db, META_LOG_SEQ)?;

        tracing::info!(
            path = %path.display(),
            bounty_seq,
            log_seq,
            "Opened RocksDB"
        );

        Ok(Self {
            db,
            bounty_seq: AtomicU64::new(bounty_seq),
            log_seq: AtomicU64::new(log_seq),
        })
    }

    // Column family options

    fn cf_options_tables() -> Options {
        let mut opts = Options::default();
        // Small, frequently read tables; LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        // Append-only archive, favor compression ratio
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_participation() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups on composite keys benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn read_counter(db: &DB, key: &[u8]) -> Result<u64> {
        let cf = db
            .cf_handle(CF_META)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_META)))?;

        let value = match db.get_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt counter value".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };

        Ok(value)
    }

    // Key helpers

    fn user_key(id: UserId) -> [u8; 8] {
        id.as_i64().to_be_bytes()
    }

    fn bounty_key(id: BountyId) -> [u8; 8] {
        id.as_u64().to_be_bytes()
    }

    fn participation_key(bounty_id: BountyId, user_id: UserId) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&bounty_id.as_u64().to_be_bytes());
        key[8..].copy_from_slice(&user_id.as_i64().to_be_bytes());
        key
    }

    /// Stage a log entry into `batch`, allocating the next sequence number
    ///
    /// A batch that later fails to commit leaves a gap in the sequence;
    /// gaps carry no meaning.
    fn stage_log(&self, batch: &mut WriteBatch, entry: &LogEntry) -> Result<()> {
        let seq = self.log_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let cf_log = self.cf_handle(CF_LOG)?;
        let cf_meta = self.cf_handle(CF_META)?;

        batch.put_cf(cf_log, seq.to_be_bytes(), bincode::serialize(entry)?);
        batch.put_cf(cf_meta, META_LOG_SEQ, seq.to_be_bytes());

        Ok(())
    }

    // User operations

    /// Get user by id
    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let cf = self.cf_handle(CF_USERS)?;

        match self.db.get_cf(cf, Self::user_key(id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Persist a user row together with its audit entry (atomic)
    pub fn put_user_logged(&self, user: &User, entry: &LogEntry) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_users = self.cf_handle(CF_USERS)?;
        batch.put_cf(cf_users, Self::user_key(user.id), bincode::serialize(user)?);

        self.stage_log(&mut batch, entry)?;

        self.db.write(batch)?;

        tracing::debug!(
            user = %user.id,
            shares = user.shares,
            action = %entry.action,
            "User updated"
        );

        Ok(())
    }

    // Bounty operations

    /// Create a bounty, assigning the next monotonic id (atomic)
    pub fn create_bounty(
        &self,
        name: &str,
        capacity: u32,
        end_time: i64,
        created_at: i64,
    ) -> Result<Bounty> {
        let id = self.bounty_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let bounty = Bounty {
            id: BountyId::new(id),
            name: name.to_string(),
            capacity,
            end_time,
            is_active: true,
            created_at,
        };

        let mut batch = WriteBatch::default();

        let cf_bounties = self.cf_handle(CF_BOUNTIES)?;
        let cf_meta = self.cf_handle(CF_META)?;
        batch.put_cf(
            cf_bounties,
            Self::bounty_key(bounty.id),
            bincode::serialize(&bounty)?,
        );
        batch.put_cf(cf_meta, META_BOUNTY_SEQ, id.to_be_bytes());

        self.db.write(batch)?;

        tracing::debug!(bounty = %bounty.id, name = %bounty.name, "Bounty created");

        Ok(bounty)
    }

    /// Overwrite a bounty row (state transitions)
    pub fn put_bounty(&self, bounty: &Bounty) -> Result<()> {
        let cf = self.cf_handle(CF_BOUNTIES)?;
        self.db
            .put_cf(cf, Self::bounty_key(bounty.id), bincode::serialize(bounty)?)?;

        tracing::debug!(
            bounty = %bounty.id,
            is_active = bounty.is_active,
            "Bounty updated"
        );

        Ok(())
    }

    // Participation operations

    /// Insert a participation row, credit the user, append the log (atomic)
    pub fn record_join(&self, user: &User, bounty_id: BountyId, entry: &LogEntry) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_participation = self.cf_handle(CF_PARTICIPATION)?;
        let cf_users = self.cf_handle(CF_USERS)?;

        batch.put_cf(
            cf_participation,
            Self::participation_key(bounty_id, user.id),
            [],
        );
        batch.put_cf(cf_users, Self::user_key(user.id), bincode::serialize(user)?);
        self.stage_log(&mut batch, entry)?;

        self.db.write(batch)?;

        tracing::debug!(user = %user.id, bounty = %bounty_id, "Participation added");

        Ok(())
    }

    /// Delete a participation row, debit the user, append the log (atomic)
    pub fn record_leave(&self, user: &User, bounty_id: BountyId, entry: &LogEntry) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_participation = self.cf_handle(CF_PARTICIPATION)?;
        let cf_users = self.cf_handle(CF_USERS)?;

        batch.delete_cf(
            cf_participation,
            Self::participation_key(bounty_id, user.id),
        );
        batch.put_cf(cf_users, Self::user_key(user.id), bincode::serialize(user)?);
        self.stage_log(&mut batch, entry)?;

        self.db.write(batch)?;

        tracing::debug!(user = %user.id, bounty = %bounty_id, "Participation removed");

        Ok(())
    }

    // Settings operations

    /// Upsert a setting
    pub fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let cf = self.cf_handle(CF_SETTINGS)?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    // Log operations

    /// Append a standalone log entry (atomic with its sequence bump)
    pub fn append_log(&self, entry: &LogEntry) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_log(&mut batch, entry)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Most-recent-first log entries affecting `to`, up to `limit`
    ///
    /// Linear scan from the tail; log volume is chat-scale.
    pub fn recent_log_for(&self, to: UserId, limit: usize) -> Result<Vec<LogEntry>> {
        let cf = self.cf_handle(CF_LOG)?;

        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            let (_, value) = item?;
            let entry: LogEntry = bincode::deserialize(&value)?;

            if entry.to == to {
                entries.push(entry);
                if entries.len() == limit {
                    break;
                }
            }
        }

        Ok(entries)
    }

    // Full-table loaders for cache rebuild

    /// Load all users
    pub fn load_users(&self) -> Result<Vec<User>> {
        let cf = self.cf_handle(CF_USERS)?;

        let mut users = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            users.push(bincode::deserialize(&value)?);
        }

        Ok(users)
    }

    /// Load all bounties
    pub fn load_bounties(&self) -> Result<Vec<Bounty>> {
        let cf = self.cf_handle(CF_BOUNTIES)?;

        let mut bounties = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            bounties.push(bincode::deserialize(&value)?);
        }

        Ok(bounties)
    }

    /// Load all participation links
    pub fn load_participation(&self) -> Result<Vec<(BountyId, UserId)>> {
        let cf = self.cf_handle(CF_PARTICIPATION)?;

        let mut links = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            if key.len() != 16 {
                return Err(Error::Storage("Corrupt participation key".to_string()));
            }

            let bounty_raw: [u8; 8] = key[..8].try_into().expect("length checked");
            let user_raw: [u8; 8] = key[8..].try_into().expect("length checked");
            links.push((
                BountyId::new(u64::from_be_bytes(bounty_raw)),
                UserId::new(i64::from_be_bytes(user_raw)),
            ));
        }

        Ok(links)
    }

    /// Load all settings overrides
    pub fn load_settings(&self) -> Result<Vec<(String, String)>> {
        let cf = self.cf_handle(CF_SETTINGS)?;

        let mut settings = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|_| Error::Storage("Corrupt setting key".to_string()))?;
            let value = String::from_utf8(value.to_vec())
                .map_err(|_| Error::Storage("Corrupt setting value".to_string()))?;
            settings.push((key, value));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogAction;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_user(id: i64) -> User {
        User {
            id: UserId::new(id),
            display_name: format!("user{}", id),
            shares: 10,
            is_admin: false,
            created_at: 1_000,
        }
    }

    fn test_entry(from: i64, to: i64, amount: i64) -> LogEntry {
        LogEntry::new(
            UserId::new(from),
            UserId::new(to),
            LogAction::Grant,
            None,
            amount,
            2_000,
        )
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_USERS).is_some());
        assert!(storage.db.cf_handle(CF_LOG).is_some());
    }

    #[test]
    fn test_user_roundtrip_with_log() {
        let (storage, _temp) = test_storage();

        let user = test_user(7);
        storage
            .put_user_logged(&user, &test_entry(7, 7, 10))
            .unwrap();

        let loaded = storage.get_user(UserId::new(7)).unwrap().unwrap();
        assert_eq!(loaded, user);
        assert!(storage.get_user(UserId::new(8)).unwrap().is_none());

        let log = storage.recent_log_for(UserId::new(7), 15).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].amount, 10);
    }

    #[test]
    fn test_bounty_ids_are_monotonic_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        {
            let storage = Storage::open(&config).unwrap();
            let a = storage.create_bounty("first", 2, 5_000, 1_000).unwrap();
            let b = storage.create_bounty("second", 2, 5_000, 1_000).unwrap();
            assert_eq!(a.id.as_u64(), 1);
            assert_eq!(b.id.as_u64(), 2);
        }

        // Reopen: counter must resume, not restart
        let storage = Storage::open(&config).unwrap();
        let c = storage.create_bounty("third", 2, 5_000, 1_000).unwrap();
        assert_eq!(c.id.as_u64(), 3);
    }

    #[test]
    fn test_join_writes_all_three_rows() {
        let (storage, _temp) = test_storage();

        let mut user = test_user(1);
        storage
            .put_user_logged(&user, &test_entry(1, 1, 10))
            .unwrap();
        let bounty = storage.create_bounty("alley", 2, 5_000, 1_000).unwrap();

        user.shares += 1;
        let entry = LogEntry::new(
            user.id,
            user.id,
            LogAction::Join,
            Some(bounty.id),
            1,
            2_000,
        );
        storage.record_join(&user, bounty.id, &entry).unwrap();

        assert_eq!(storage.get_user(user.id).unwrap().unwrap().shares, 11);
        assert_eq!(storage.load_participation().unwrap(), vec![(bounty.id, user.id)]);

        let log = storage.recent_log_for(user.id, 15).unwrap();
        assert_eq!(log[0].action, LogAction::Join);
        assert_eq!(log[0].subject, Some(bounty.id));
    }

    #[test]
    fn test_leave_removes_participation() {
        let (storage, _temp) = test_storage();

        let mut user = test_user(1);
        storage
            .put_user_logged(&user, &test_entry(1, 1, 10))
            .unwrap();
        let bounty = storage.create_bounty("alley", 2, 5_000, 1_000).unwrap();

        user.shares += 1;
        let join = LogEntry::new(user.id, user.id, LogAction::Join, Some(bounty.id), 1, 2_000);
        storage.record_join(&user, bounty.id, &join).unwrap();

        user.shares -= 1;
        let leave = LogEntry::new(
            user.id,
            user.id,
            LogAction::Abandon,
            Some(bounty.id),
            -1,
            3_000,
        );
        storage.record_leave(&user, bounty.id, &leave).unwrap();

        assert!(storage.load_participation().unwrap().is_empty());
        assert_eq!(storage.get_user(user.id).unwrap().unwrap().shares, 10);
    }

    #[test]
    fn test_recent_log_is_most_recent_first() {
        let (storage, _temp) = test_storage();

        for i in 0..20 {
            storage.append_log(&test_entry(1, 2, i)).unwrap();
        }

        let log = storage.recent_log_for(UserId::new(2), 15).unwrap();
        assert_eq!(log.len(), 15);
        assert_eq!(log[0].amount, 19);
        assert_eq!(log[14].amount, 5);
    }

    #[test]
    fn test_settings_roundtrip() {
        let (storage, _temp) = test_storage();

        storage.put_setting("otj_shares", "5").unwrap();
        storage.put_setting("allocation", "$250").unwrap();

        let mut settings = storage.load_settings().unwrap();
        settings.sort();
        assert_eq!(
            settings,
            vec![
                ("allocation".to_string(), "$250".to_string()),
                ("otj_shares".to_string(), "5".to_string()),
            ]
        );
    }
}
