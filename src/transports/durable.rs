//! # Durable transport: a persistent ordered log with fan-out and replay.
//!
//! Updates are stored in an embedded key-ordered database, one entry per
//! update, under the key `big_endian(sequence) || update_id`. The 8-byte
//! prefix dominates the sort order, so a forward cursor walk visits updates
//! in commit order; the ID suffix keeps keys unique regardless of content.
//!
//! ## Write path
//! One write transaction per update: obtain the next sequence, run the
//! probabilistic cleanup, insert the new entry, commit. A single mutex
//! serializes writes, because the storage allows one read-write transaction
//! at a time and the attached-pipe set is mutated under the same lock.
//!
//! ## Retention
//! With `size > 0`, each write *may* delete every entry whose sequence is at
//! most `seq - size`, gated by `cleanup_frequency`: `1` cleans on every
//! write, `0` never cleans, anything between is a per-write probability. At
//! quiescence the log holds at most the `size` most recent entries.
//!
//! ## Replay
//! A pipe created with a resume point gets a dedicated task that walks a
//! read snapshot from the first key: entries up to and including the resume
//! point are skipped, every later entry is decoded and delivered on the
//! history input, and the walk stops at the sequence observed at attach
//! time. Updates written after attach arrive through the live input only,
//! so nothing is delivered twice or out of order. If the resume point is
//! not found the walk skips everything and the subscriber starts live-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, Table, TableDefinition};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::error;
use url::Url;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::subscribers::{self, Pipe, PipeSender, Subscriber};
use crate::updates::Update;

use super::{fan_out, Transport};

const DEFAULT_BUCKET_NAME: &str = "updates";
const DEFAULT_CLEANUP_FREQUENCY: f64 = 0.3;

/// Mutable transport state guarded by the single write mutex.
struct State {
    pipes: HashMap<u64, PipeSender>,
    /// `None` once `close` has released the transport's handle; in-flight
    /// replay tasks hold their own clones until they finish.
    db: Option<Arc<Database>>,
}

/// Fan-out transport backed by a persistent, monotonically ordered log.
pub struct DurableTransport {
    bucket_name: String,
    size: u64,
    cleanup_frequency: f64,
    cfg: TransportConfig,
    state: Mutex<State>,
    next_pipe_id: AtomicU64,
    /// Greatest committed sequence; read lock-free for replay watermarks,
    /// advanced only under the write lock.
    last_seq: AtomicU64,
    done: CancellationToken,
}

impl DurableTransport {
    /// Opens (or creates) the database named by the DSN.
    ///
    /// Recognized query parameters: `bucket_name` (default `"updates"`),
    /// `size` (default 0, unbounded) and `cleanup_frequency` (default 0.3,
    /// must lie in `[0, 1]`). The database path is the URL path, or the URL
    /// host for relative DSNs such as `bolt://updates.db`.
    pub fn open(dsn: &Url, cfg: TransportConfig) -> Result<Self, TransportError> {
        let mut bucket_name = DEFAULT_BUCKET_NAME.to_owned();
        let mut size = 0u64;
        let mut cleanup_frequency = DEFAULT_CLEANUP_FREQUENCY;

        for (name, value) in dsn.query_pairs() {
            match name.as_ref() {
                "bucket_name" if !value.is_empty() => bucket_name = value.into_owned(),
                "size" => {
                    size = value.parse().map_err(|err| {
                        TransportError::invalid_dsn(dsn.as_str(), format!("parameter size: {err}"))
                    })?;
                }
                "cleanup_frequency" => {
                    cleanup_frequency = value.parse().map_err(|err| {
                        TransportError::invalid_dsn(
                            dsn.as_str(),
                            format!("parameter cleanup_frequency: {err}"),
                        )
                    })?;
                    if !(0.0..=1.0).contains(&cleanup_frequency) {
                        return Err(TransportError::invalid_dsn(
                            dsn.as_str(),
                            "parameter cleanup_frequency: out of range [0, 1]",
                        ));
                    }
                }
                _ => {}
            }
        }

        let path = match dsn.path() {
            "" => dsn.host_str().unwrap_or(""),
            path => path,
        };
        if path.is_empty() {
            return Err(TransportError::invalid_dsn(dsn.as_str(), "missing path"));
        }

        let db = Database::create(path)
            .map_err(|err| TransportError::invalid_dsn(dsn.as_str(), err))?;
        let last_seq = recover_last_seq(&db, &bucket_name)?;

        Ok(Self {
            bucket_name,
            size,
            cleanup_frequency,
            cfg,
            state: Mutex::new(State {
                pipes: HashMap::new(),
                db: Some(Arc::new(db)),
            }),
            next_pipe_id: AtomicU64::new(0),
            last_seq: AtomicU64::new(last_seq),
            done: CancellationToken::new(),
        })
    }

    /// Number of currently attached pipes.
    pub async fn pipe_count(&self) -> usize {
        self.state.lock().await.pipes.len()
    }

    fn table(&self) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
        TableDefinition::new(&self.bucket_name)
    }

    /// Stores one update in its own transaction; advances `last_seq` only
    /// after the commit so a failed write leaves no trace.
    fn persist(&self, db: &Database, update_id: &str, payload: &[u8]) -> Result<(), TransportError> {
        let wtx = db.begin_write()?;
        let seq = self.last_seq.load(Ordering::Acquire) + 1;
        {
            let mut table = wtx.open_table(self.table())?;
            self.cleanup(&mut table, seq)?;
            let key = make_key(seq, update_id);
            table.insert(key.as_slice(), payload)?;
        }
        wtx.commit()?;
        self.last_seq.store(seq, Ordering::Release);
        Ok(())
    }

    fn should_clean(&self, seq: u64) -> bool {
        if self.size == 0 || self.cleanup_frequency <= 0.0 || seq <= self.size {
            return false;
        }
        self.cleanup_frequency >= 1.0 || rand::random::<f64>() < self.cleanup_frequency
    }

    /// Deletes entries above the retention cap, within the current write
    /// transaction.
    fn cleanup(
        &self,
        table: &mut Table<'_, &'static [u8], &'static [u8]>,
        seq: u64,
    ) -> Result<(), TransportError> {
        if !self.should_clean(seq) {
            return Ok(());
        }

        let remove_until = seq - self.size;
        let mut expired = Vec::new();
        for entry in table.range::<&[u8]>(..)? {
            let (key, _) = entry?;
            match split_key(key.value()) {
                Some((sequence, _)) if sequence <= remove_until => {
                    expired.push(key.value().to_vec());
                }
                _ => break,
            }
        }
        for key in expired {
            table.remove(key.as_slice())?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for DurableTransport {
    async fn write(&self, update: Update) -> Result<(), TransportError> {
        if self.done.is_cancelled() {
            return Err(TransportError::Closed);
        }

        let payload = serde_json::to_vec(&update)?;

        let mut state = self.state.lock().await;
        let Some(db) = state.db.clone() else {
            return Err(TransportError::Closed);
        };
        self.persist(&db, update.id(), &payload)?;
        fan_out(&mut state.pipes, &Arc::new(update)).await;
        Ok(())
    }

    async fn create_pipe(&self, subscriber: Subscriber) -> Result<Pipe, TransportError> {
        let mut state = self.state.lock().await;
        let Some(db) = state.db.clone() else {
            return Err(TransportError::Closed);
        };

        let from_id = subscriber.last_event_id().map(str::to_owned);
        let parts = subscribers::spawn(subscriber, &self.cfg, from_id.is_some());
        let id = self.next_pipe_id.fetch_add(1, Ordering::Relaxed);
        state.pipes.insert(id, parts.live);

        if let (Some(from_id), Some(history)) = (from_id, parts.history) {
            // Watermark: everything newer arrives through the live input.
            let to_seq = self.last_seq.load(Ordering::Acquire);
            let bucket = self.bucket_name.clone();
            tokio::spawn(async move {
                if let Err(err) = replay(db, bucket, &from_id, to_seq, &history).await {
                    error!(error = %err, from_id = %from_id, "history replay failed");
                }
            });
        }

        Ok(parts.pipe)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.done.is_cancelled() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        self.done.cancel();
        for (_, pipe) in state.pipes.drain() {
            pipe.disconnect();
        }
        // Release the storage handle; the file closes as soon as in-flight
        // replay tasks drop their clones.
        state.db = None;
        Ok(())
    }
}

/// Walks a read snapshot and feeds every update after `from_id`, up to the
/// watermark, into the pipe's history input. The input closes when the
/// caller's `history` sender drops, on every exit path.
async fn replay(
    db: Arc<Database>,
    bucket: String,
    from_id: &str,
    to_seq: u64,
    history: &PipeSender,
) -> Result<(), TransportError> {
    let definition: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&bucket);
    let rtx = db.begin_read()?;
    let table = match rtx.open_table(definition) {
        Ok(table) => table,
        // No entry was ever written: nothing to replay.
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    let mut after_resume_point = false;
    for entry in table.range::<&[u8]>(..)? {
        let (key, value) = entry?;
        let Some((seq, id)) = split_key(key.value()) else {
            continue;
        };
        if !after_resume_point {
            if id == from_id.as_bytes() {
                after_resume_point = true;
            }
            continue;
        }

        // Entries past the watermark were committed after the pipe attached;
        // those arrive through the live input instead.
        if to_seq > 0 && seq > to_seq {
            return Ok(());
        }

        let update: Update = serde_json::from_slice(value.value())?;
        if !history.dispatch(Arc::new(update)).await || seq == to_seq {
            return Ok(());
        }
    }
    Ok(())
}

fn recover_last_seq(db: &Database, bucket_name: &str) -> Result<u64, TransportError> {
    let definition: TableDefinition<&[u8], &[u8]> = TableDefinition::new(bucket_name);
    let rtx = db.begin_read()?;
    let table = match rtx.open_table(definition) {
        Ok(table) => table,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
        Err(err) => return Err(err.into()),
    };
    let last = table.last()?;
    Ok(last
        .and_then(|(key, _)| split_key(key.value()).map(|(seq, _)| seq))
        .unwrap_or(0))
}

fn make_key(seq: u64, update_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + update_id.len());
    key.extend_from_slice(&seq.to_be_bytes());
    key.extend_from_slice(update_id.as_bytes());
    key
}

fn split_key(key: &[u8]) -> Option<(u64, &[u8])> {
    if key.len() < 8 {
        return None;
    }
    let (prefix, id) = key.split_at(8);
    let mut sequence = [0u8; 8];
    sequence.copy_from_slice(prefix);
    Some((u64::from_be_bytes(sequence), id))
}
