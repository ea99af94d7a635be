//! Disk I/O statistics source.
//!
//! This module keeps a live view of `/proc/diskstats`: the latest counter
//! record for every block device and the per-device difference between the
//! two most recent polls.
//!
//! Each line of the source carries at least the following 14 fields:
//!
//! ```text
//!  1  major number
//!  2  minor number
//!  3  device name
//!  4  reads completed successfully
//!  5  reads merged
//!  6  sectors read
//!  7  time spent reading (ms)
//!  8  writes completed
//!  9  writes merged
//! 10  sectors written
//! 11  time spent writing (ms)
//! 12  I/Os currently in progress
//! 13  time spent doing I/Os (ms)
//! 14  weighted time spent doing I/Os (ms)
//! ```
//!
//! Kernel 4.18+ appends four discard fields and 5.5+ two flush fields. They
//! are accepted on the line but not parsed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::sanitize_disk_name;
use crate::error::DiskstatsError;
use crate::worker::spawn_periodic;

/// Default location of the kernel counter source.
pub const DEFAULT_DISKSTATS_PATH: &str = "/proc/diskstats";

/// Size of a sector as reported by `/proc/diskstats`, independent of the
/// device's physical sector size.
pub const SECTOR_SIZE: u64 = 512;

/// Number of leading fields interpreted per line.
pub const STATLINE_FIELDS: usize = 14;

/// Counter record for a single block device.
///
/// The same type holds a delta between two polls, in which case `major` and
/// `minor` are 0 and every counter is the difference over that interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statline {
    pub major: u64,
    pub minor: u64,
    pub name: String,
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub time_reading_ms: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub time_writing_ms: u64,
    pub ios_in_progress: u64,
    pub time_io_ms: u64,
    pub weighted_time_io_ms: u64,
}

impl Statline {
    /// Parses one `/proc/diskstats` line.
    ///
    /// Fields beyond the 14th are ignored.
    pub fn parse(line: &str) -> Result<Self, DiskstatsError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < STATLINE_FIELDS {
            return Err(DiskstatsError::Parse {
                line: line.to_string(),
                reason: format!(
                    "expected at least {} fields, found {}",
                    STATLINE_FIELDS,
                    parts.len()
                ),
            });
        }

        let field = |index: usize| -> Result<u64, DiskstatsError> {
            parts[index]
                .parse::<u64>()
                .map_err(|e| DiskstatsError::Parse {
                    line: line.to_string(),
                    reason: format!("field {} ({:?}): {}", index + 1, parts[index], e),
                })
        };

        Ok(Self {
            major: field(0)?,
            minor: field(1)?,
            name: parts[2].to_string(),
            reads_completed: field(3)?,
            reads_merged: field(4)?,
            sectors_read: field(5)?,
            time_reading_ms: field(6)?,
            writes_completed: field(7)?,
            writes_merged: field(8)?,
            sectors_written: field(9)?,
            time_writing_ms: field(10)?,
            ios_in_progress: field(11)?,
            time_io_ms: field(12)?,
            weighted_time_io_ms: field(13)?,
        })
    }

    /// Field-wise difference `self - previous`.
    ///
    /// Counters are assumed monotonic between polls; a counter that went
    /// backwards yields 0 for that field.
    pub fn delta_since(&self, previous: &Statline) -> Statline {
        Statline {
            major: self.major.saturating_sub(previous.major),
            minor: self.minor.saturating_sub(previous.minor),
            name: self.name.clone(),
            reads_completed: self.reads_completed.saturating_sub(previous.reads_completed),
            reads_merged: self.reads_merged.saturating_sub(previous.reads_merged),
            sectors_read: self.sectors_read.saturating_sub(previous.sectors_read),
            time_reading_ms: self.time_reading_ms.saturating_sub(previous.time_reading_ms),
            writes_completed: self
                .writes_completed
                .saturating_sub(previous.writes_completed),
            writes_merged: self.writes_merged.saturating_sub(previous.writes_merged),
            sectors_written: self.sectors_written.saturating_sub(previous.sectors_written),
            time_writing_ms: self.time_writing_ms.saturating_sub(previous.time_writing_ms),
            ios_in_progress: self.ios_in_progress.saturating_sub(previous.ios_in_progress),
            time_io_ms: self.time_io_ms.saturating_sub(previous.time_io_ms),
            weighted_time_io_ms: self
                .weighted_time_io_ms
                .saturating_sub(previous.weighted_time_io_ms),
        }
    }

    /// Bytes read and written, `(read_bytes, write_bytes)`.
    ///
    /// On a delta this is the volume moved during the poll interval, not a
    /// per-second rate. Dividing by the interval is up to the caller.
    pub fn rate(&self) -> (u64, u64) {
        (
            self.sectors_read.saturating_mul(SECTOR_SIZE),
            self.sectors_written.saturating_mul(SECTOR_SIZE),
        )
    }
}

/// Live view of a diskstats source.
///
/// Only [`Diskstats::poll`] mutates the snapshot and delta maps. Readers may
/// run concurrently with it; each map sits behind its own `RwLock`.
pub struct Diskstats {
    path: PathBuf,
    interval: Duration,
    source: Mutex<File>,
    stats: RwLock<HashMap<String, Statline>>,
    delta: RwLock<HashMap<String, Statline>>,
    polls: AtomicU64,
}

impl Diskstats {
    /// Opens the source at `path` and performs the first poll.
    ///
    /// `interval` is the period of the background worker and the time base
    /// for converting deltas into rates.
    pub fn open(path: impl AsRef<Path>, interval: Duration) -> Result<Self, DiskstatsError> {
        if interval.is_zero() {
            return Err(DiskstatsError::InvalidInterval);
        }

        let path = path.as_ref().to_path_buf();
        debug!("Opening diskstats source {}", path.display());
        let file = File::open(&path).map_err(|source| DiskstatsError::Io {
            path: path.clone(),
            source,
        })?;

        let stats = Self {
            path,
            interval,
            source: Mutex::new(file),
            stats: RwLock::new(HashMap::new()),
            delta: RwLock::new(HashMap::new()),
            polls: AtomicU64::new(0),
        };
        stats.poll()?;
        Ok(stats)
    }

    /// Path of the underlying source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll period of the background worker.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of successful polls, including the initial one.
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Re-reads the source and commits a new snapshot and delta map.
    ///
    /// Every line is parsed before anything is committed. On error the
    /// previous snapshot and delta stay in place untouched.
    pub fn poll(&self) -> Result<(), DiskstatsError> {
        // Held for the whole poll so concurrent callers serialize here.
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);

        let io_error = |e| DiskstatsError::Io {
            path: self.path.clone(),
            source: e,
        };
        let mut content = String::new();
        source.seek(SeekFrom::Start(0)).map_err(io_error)?;
        source.read_to_string(&mut content).map_err(io_error)?;

        let mut fresh = HashMap::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let statline = Statline::parse(line)?;
            fresh.insert(statline.name.clone(), statline);
        }

        let delta: HashMap<String, Statline> = {
            let previous = self.stats.read().unwrap_or_else(PoisonError::into_inner);
            fresh
                .values()
                .filter_map(|current| {
                    previous
                        .get(&current.name)
                        .map(|old| (current.name.clone(), current.delta_since(old)))
                })
                .collect()
        };

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        let mut deltas = self.delta.write().unwrap_or_else(PoisonError::into_inner);
        *stats = fresh;
        *deltas = delta;
        drop(deltas);
        drop(stats);

        self.polls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Latest counters for `device`, resolved through [`sanitize_disk_name`].
    pub fn get(&self, device: &str) -> Option<Statline> {
        let name = sanitize_disk_name(device);
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
    }

    /// Latest delta for `device`.
    ///
    /// `None` until the device has been seen in two consecutive polls.
    pub fn get_delta(&self, device: &str) -> Option<Statline> {
        let name = sanitize_disk_name(device);
        self.delta
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
    }

    /// Names of all devices in the current snapshot, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Logs read/write completion counters of every known device.
    pub fn log_summary(&self) {
        let stats = self.stats.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = stats.keys().collect();
        names.sort();
        for name in names {
            let sl = &stats[name];
            debug!(
                "{} reads={} writes={}",
                name, sl.reads_completed, sl.writes_completed
            );
        }
    }

    /// Spawns the background poll loop.
    ///
    /// The first poll happens one interval from now; [`Diskstats::open`]
    /// already took the initial reading. A failed poll is logged and the
    /// loop carries on. The task ends once `cancel` fires.
    pub fn start_worker(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Starting diskstats worker for {} every {:?}",
            self.path.display(),
            self.interval
        );
        let stats = Arc::clone(self);
        spawn_periodic("diskstats", self.interval, cancel, move || {
            if let Err(e) = stats.poll() {
                warn!("Diskstats poll failed: {}", e);
            }
            std::future::ready(())
        })
    }
}

/// Reads the whole source once, without keeping any state.
///
/// Used by startup checks that only need to know whether the source is
/// readable and which devices it lists.
pub fn read_diskstats(path: impl AsRef<Path>) -> Result<HashMap<String, Statline>, DiskstatsError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| DiskstatsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| Statline::parse(line).map(|sl| (sl.name.clone(), sl)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SDA: &str = "   8       0 sda 100 2 10 40 200 3 20 50 0 60 90";
    const SDA_EXTENDED: &str =
        "   8       0 sda 100 2 10 40 200 3 20 50 0 60 90 7 0 16 1 4 2";

    fn source_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn rewrite(file: &NamedTempFile, content: &str) {
        std::fs::write(file.path(), content).unwrap();
    }

    #[test]
    fn test_parse_line() {
        let sl = Statline::parse(SDA).unwrap();
        assert_eq!(sl.name, "sda");
        assert_eq!(
            (sl.major, sl.minor, sl.reads_completed, sl.reads_merged),
            (8, 0, 100, 2)
        );
        assert_eq!(
            (sl.sectors_read, sl.time_reading_ms, sl.writes_completed),
            (10, 40, 200)
        );
        assert_eq!(
            (sl.writes_merged, sl.sectors_written, sl.time_writing_ms),
            (3, 20, 50)
        );
        assert_eq!(
            (sl.ios_in_progress, sl.time_io_ms, sl.weighted_time_io_ms),
            (0, 60, 90)
        );
    }

    #[test]
    fn test_parse_ignores_discard_and_flush_fields() {
        assert_eq!(
            Statline::parse(SDA_EXTENDED).unwrap(),
            Statline::parse(SDA).unwrap()
        );
    }

    #[test]
    fn test_parse_too_few_fields() {
        let err = Statline::parse("8 0 sda 1 2 3").unwrap_err();
        assert!(matches!(err, DiskstatsError::Parse { .. }));
        assert!(err.to_string().contains("found 6"));
    }

    #[test]
    fn test_parse_non_numeric() {
        let err = Statline::parse("8 0 sda 1 2 x 4 5 6 7 8 9 10 11").unwrap_err();
        assert!(matches!(err, DiskstatsError::Parse { .. }));
        assert!(err.to_string().contains("field 6"));
    }

    #[test]
    fn test_parse_negative_is_rejected() {
        assert!(Statline::parse("8 0 sda -1 2 3 4 5 6 7 8 9 10 11").is_err());
    }

    #[test]
    fn test_rate_uses_512_byte_sectors() {
        let sl = Statline {
            sectors_read: 10,
            sectors_written: 20,
            ..Default::default()
        };
        assert_eq!(sl.rate(), (5120, 10240));
    }

    #[test]
    fn test_delta_since() {
        let old = Statline::parse("8 0 sda 1 2 3 4 5 6 7 8 9 10 11").unwrap();
        let new = Statline::parse("8 0 sda 11 12 13 14 15 16 17 18 19 20 21").unwrap();
        let delta = new.delta_since(&old);
        assert_eq!(delta.name, "sda");
        assert_eq!((delta.major, delta.minor), (0, 0));
        assert_eq!(delta.reads_completed, 10);
        assert_eq!(delta.sectors_written, 10);
        assert_eq!(delta.weighted_time_io_ms, 10);
    }

    #[test]
    fn test_delta_saturates_on_reset() {
        let old = Statline::parse("8 0 sda 100 0 0 0 0 0 0 0 0 0 0").unwrap();
        let new = Statline::parse("8 0 sda 5 0 0 0 0 0 0 0 0 0 0").unwrap();
        assert_eq!(new.delta_since(&old).reads_completed, 0);
    }

    #[test]
    fn test_open_missing_source() {
        let err = Diskstats::open("/nonexistent/diskstats", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, DiskstatsError::Io { .. }));
    }

    #[test]
    fn test_open_zero_interval() {
        let file = source_with(SDA);
        let err = Diskstats::open(file.path(), Duration::ZERO).err().unwrap();
        assert!(matches!(err, DiskstatsError::InvalidInterval));
    }

    #[test]
    fn test_open_propagates_parse_error() {
        let file = source_with("8 0 sda 1 2\n");
        let err = Diskstats::open(file.path(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, DiskstatsError::Parse { .. }));
    }

    #[test]
    fn test_first_poll_has_snapshot_but_no_delta() {
        let file = source_with(&format!("{}\n", SDA));
        let stats = Diskstats::open(file.path(), Duration::from_secs(1)).unwrap();
        assert!(stats.get("sda").is_some());
        assert!(stats.get("/dev/sda").is_some());
        assert!(stats.get_delta("sda").is_none());
        assert!(stats.get("sdb").is_none());
        assert_eq!(stats.poll_count(), 1);
    }

    #[test]
    fn test_second_poll_produces_delta() {
        let file = source_with("8 0 sda 1 0 10 0 1 0 20 0 0 0 0\n");
        let stats = Diskstats::open(file.path(), Duration::from_secs(1)).unwrap();

        rewrite(
            &file,
            "8 0 sda 3 0 110 0 4 0 220 0 0 0 0\n8 16 sdb 1 0 1 0 1 0 1 0 0 0 0\n",
        );
        stats.poll().unwrap();

        let delta = stats.get_delta("sda").unwrap();
        assert_eq!(delta.reads_completed, 2);
        assert_eq!(delta.sectors_read, 100);
        assert_eq!(delta.sectors_written, 200);
        assert_eq!(delta.rate(), (51200, 102400));

        // sdb was only seen once
        assert!(stats.get("sdb").is_some());
        assert!(stats.get_delta("sdb").is_none());
        assert_eq!(stats.devices(), vec!["sda".to_string(), "sdb".to_string()]);
    }

    #[test]
    fn test_failed_poll_keeps_previous_state() {
        let file = source_with("8 0 sda 1 0 10 0 1 0 20 0 0 0 0\n");
        let stats = Diskstats::open(file.path(), Duration::from_secs(1)).unwrap();
        rewrite(&file, "8 0 sda 2 0 20 0 2 0 40 0 0 0 0\n");
        stats.poll().unwrap();

        let snapshot = stats.get("sda").unwrap();
        let delta = stats.get_delta("sda").unwrap();

        // First line is valid, second is not: nothing of this poll may show.
        rewrite(
            &file,
            "8 0 sda 9 0 90 0 9 0 90 0 0 0 0\n8 16 sdb 1 2 oops\n",
        );
        assert!(stats.poll().is_err());

        assert_eq!(stats.get("sda").unwrap(), snapshot);
        assert_eq!(stats.get_delta("sda").unwrap(), delta);
        assert!(stats.get("sdb").is_none());
        assert_eq!(stats.poll_count(), 2);
    }

    #[test]
    fn test_read_diskstats() {
        let file = source_with(&format!("{}\n   8 16 sdb 1 0 1 0 1 0 1 0 0 0 0\n", SDA));
        let stats = read_diskstats(file.path()).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["sdb"].major, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_polls_until_cancelled() {
        let file = source_with("8 0 sda 1 0 10 0 1 0 20 0 0 0 0\n");
        let stats =
            Arc::new(Diskstats::open(file.path(), Duration::from_millis(100)).unwrap());
        let cancel = CancellationToken::new();
        let handle = stats.start_worker(cancel.clone());

        rewrite(&file, "8 0 sda 2 0 30 0 2 0 60 0 0 0 0\n");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(stats.poll_count(), 2);
        assert_eq!(stats.get_delta("sda").unwrap().sectors_read, 20);

        cancel.cancel();
        handle.await.unwrap();
        let polls = stats.poll_count();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(stats.poll_count(), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_failed_poll() {
        let file = source_with("8 0 sda 1 0 10 0 1 0 20 0 0 0 0\n");
        let stats =
            Arc::new(Diskstats::open(file.path(), Duration::from_millis(100)).unwrap());
        let cancel = CancellationToken::new();
        let handle = stats.start_worker(cancel.clone());

        rewrite(&file, "garbage\n");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(stats.poll_count(), 1);

        rewrite(&file, "8 0 sda 5 0 50 0 5 0 60 0 0 0 0\n");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(stats.poll_count(), 2);
        assert_eq!(stats.get_delta("sda").unwrap().sectors_read, 40);

        cancel.cancel();
        handle.await.unwrap();
    }
}
