use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use stowage_types::{StorageError, StorageResult};

use crate::config::{LogConfig, SyncPolicy};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Internal mutable state for the log writer.
#[derive(Debug)]
struct LogWriter {
    writer: BufWriter<File>,
    /// Current write offset in the log file.
    offset: u64,
    /// Set when a failed append could not be rolled back. A wedged log
    /// refuses further appends until it is truncated or rewritten.
    wedged: bool,
}

/// Outcome of reading one frame during a scan.
enum Frame {
    /// A complete frame whose payload passed the CRC check.
    Complete { payload: Vec<u8>, next: u64 },
    /// The bytes from the scan offset to end-of-file do not form a
    /// whole frame (a torn write from a crash).
    Torn,
}

/// Crash-recoverable append-only record log.
///
/// On-disk format of one record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload]
/// ```
///
/// Opening the log scans it front-to-back. A torn tail left by a crash
/// is trimmed away, while a checksum failure on a complete frame is
/// reported as [`StorageError::Corrupt`] rather than silently dropped:
/// a damaged middle frame means every later record would replay against
/// the wrong state.
#[derive(Debug)]
pub struct RecordLog {
    /// Path to the log file.
    path: PathBuf,
    /// Writer state behind a mutex for thread safety.
    writer: Mutex<LogWriter>,
    /// Configuration.
    config: LogConfig,
}

impl RecordLog {
    /// Open (or create) a record log at the given path.
    ///
    /// Scans the existing file and truncates any torn tail before the
    /// log accepts new appends.
    pub fn open(path: &Path, config: LogConfig) -> StorageResult<Self> {
        // Ensure parent directory exists.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Create the file on first open so the scan below has something
        // to read.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let file_len = file.metadata()?.len();
        drop(file);

        let valid_len = Self::scan_valid_len(path)?;
        if valid_len < file_len {
            warn!(
                valid_len,
                file_len,
                dropped = file_len - valid_len,
                "trimming torn tail from record log"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().read(true).append(true).open(path)?;
        let writer = BufWriter::new(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter {
                writer,
                offset: valid_len,
                wedged: false,
            }),
            config,
        })
    }

    /// Append a single record. Returns the byte offset of its frame.
    ///
    /// If the frame cannot be written in full, the file is rolled back
    /// to its pre-append length so no partial frame is left behind. If
    /// even the rollback fails the log wedges itself and refuses further
    /// appends until truncated or rewritten.
    pub fn append(&self, payload: &[u8]) -> StorageResult<u64> {
        if payload.is_empty() {
            return Err(StorageError::Serialization(
                "refusing to append an empty record".into(),
            ));
        }
        if payload.len() > u32::MAX as usize {
            return Err(StorageError::Serialization(format!(
                "record of {} bytes exceeds the u32 frame limit",
                payload.len()
            )));
        }

        let length = payload.len() as u32;
        let crc = crc32fast::hash(payload);

        let mut w = self.writer.lock().map_err(|_| StorageError::LockPoisoned)?;
        if w.wedged {
            return Err(StorageError::Wedged);
        }
        let start = w.offset;

        if let Err(err) = self.write_frame(&mut w, length, crc, payload) {
            if let Err(rollback_err) = self.rollback(&mut w, start) {
                w.wedged = true;
                warn!(
                    offset = start,
                    error = %rollback_err,
                    "could not roll back failed append; wedging log"
                );
            }
            return Err(err);
        }

        w.offset = start + HEADER_SIZE as u64 + payload.len() as u64;

        debug!(offset = start, len = payload.len(), "record appended");
        Ok(start)
    }

    /// Read every record back in append order.
    ///
    /// Expects a well-formed log: [`RecordLog::open`] trims torn tails
    /// before handing the log out, so an incomplete frame seen here is
    /// reported as corruption. Intended to be called before the log is
    /// shared between threads.
    pub fn replay(&self) -> StorageResult<Vec<Vec<u8>>> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        while offset < file_len {
            match Self::next_frame(&mut file, offset, file_len)? {
                Frame::Complete { payload, next } => {
                    records.push(payload);
                    offset = next;
                }
                Frame::Torn => {
                    return Err(StorageError::Corrupt {
                        offset,
                        reason: "incomplete frame".into(),
                    });
                }
            }
        }

        debug!(records = records.len(), "record log replayed");
        Ok(records)
    }

    /// Truncate the log to empty and clear any wedge.
    pub fn truncate(&self) -> StorageResult<()> {
        let mut w = self.writer.lock().map_err(|_| StorageError::LockPoisoned)?;

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        if matches!(self.config.sync, SyncPolicy::EveryCommit) {
            file.sync_all()?;
        }

        // Discard the old writer without flushing: after a failed
        // append it may still hold bytes that must not reach the
        // emptied file.
        let _ = std::mem::replace(&mut w.writer, BufWriter::new(file)).into_parts();
        w.offset = 0;
        w.wedged = false;

        debug!("record log truncated");
        Ok(())
    }

    /// Replace the log contents with the given records in one atomic
    /// step.
    ///
    /// The new records are written to a sibling temp file, synced, and
    /// renamed over the log, so a crash mid-rewrite leaves either the
    /// old log or the new one, never a mix. Clears any wedge.
    pub fn rewrite(&self, records: &[Vec<u8>]) -> StorageResult<()> {
        let mut w = self.writer.lock().map_err(|_| StorageError::LockPoisoned)?;

        let tmp_path = self.path.with_extension("rewrite");
        match self.install_rewrite(&tmp_path, records, &mut w) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp_path);
                Err(err)
            }
        }
    }

    /// Current write offset, which is also the log's on-disk length.
    pub fn offset(&self) -> StorageResult<u64> {
        let w = self.writer.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(w.offset)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one frame through the buffered writer and flush it.
    fn write_frame(
        &self,
        w: &mut LogWriter,
        length: u32,
        crc: u32,
        payload: &[u8],
    ) -> StorageResult<()> {
        // Write header: [length: u32 LE] [crc: u32 LE]
        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        // Write payload
        w.writer.write_all(payload)?;

        w.writer.flush()?;
        if matches!(self.config.sync, SyncPolicy::EveryCommit) {
            w.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Cut the file back to `to_offset` and reinstall a clean writer.
    ///
    /// The old writer is discarded without flushing (`into_parts` hands
    /// its buffer back unwritten), so no bytes from the failed write can
    /// reach the file before or after the truncation.
    fn rollback(&self, w: &mut LogWriter, to_offset: u64) -> StorageResult<()> {
        let fresh = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let _ = std::mem::replace(&mut w.writer, BufWriter::new(fresh)).into_parts();

        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(to_offset)?;
        file.sync_all()?;

        w.offset = to_offset;
        Ok(())
    }

    /// Build the rewrite temp file and swing it over the log.
    fn install_rewrite(
        &self,
        tmp_path: &Path,
        records: &[Vec<u8>],
        w: &mut LogWriter,
    ) -> StorageResult<()> {
        let tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)?;
        let mut tmp_writer = BufWriter::new(tmp);
        let mut offset: u64 = 0;

        for record in records {
            if record.is_empty() {
                return Err(StorageError::Serialization(
                    "refusing to rewrite with an empty record".into(),
                ));
            }
            if record.len() > u32::MAX as usize {
                return Err(StorageError::Serialization(format!(
                    "record of {} bytes exceeds the u32 frame limit",
                    record.len()
                )));
            }

            let length = record.len() as u32;
            let crc = crc32fast::hash(record);
            tmp_writer.write_all(&length.to_le_bytes())?;
            tmp_writer.write_all(&crc.to_le_bytes())?;
            tmp_writer.write_all(record)?;
            offset += HEADER_SIZE as u64 + record.len() as u64;
        }

        tmp_writer.flush()?;
        tmp_writer.get_ref().sync_all()?;
        drop(tmp_writer);

        fs::rename(tmp_path, &self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        // The old writer still points at the renamed-away inode, so its
        // drop cannot touch the new log.
        w.writer = BufWriter::new(file);
        w.offset = offset;
        w.wedged = false;

        debug!(records = records.len(), bytes = offset, "record log rewritten");
        Ok(())
    }

    /// Length of the leading run of valid frames in the file at `path`.
    fn scan_valid_len(path: &Path) -> StorageResult<u64> {
        let mut file = BufReader::new(File::open(path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut offset: u64 = 0;

        while offset < file_len {
            match Self::next_frame(&mut file, offset, file_len)? {
                Frame::Complete { next, .. } => offset = next,
                Frame::Torn => break,
            }
        }

        Ok(offset)
    }

    /// Read and validate the frame starting at `offset`.
    fn next_frame(
        file: &mut BufReader<File>,
        offset: u64,
        file_len: u64,
    ) -> StorageResult<Frame> {
        if offset + HEADER_SIZE as u64 > file_len {
            return Ok(Frame::Torn);
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Frame::Torn),
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let frame_end = offset + HEADER_SIZE as u64 + length as u64;
        if length == 0 {
            // No valid frame is empty. At end-of-file this is a torn
            // header; mid-file the framing itself is gone.
            if frame_end == file_len {
                return Ok(Frame::Torn);
            }
            return Err(StorageError::Corrupt {
                offset,
                reason: "zero-length frame".into(),
            });
        }
        if frame_end > file_len {
            return Ok(Frame::Torn);
        }

        let mut payload = vec![0u8; length as usize];
        match file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Frame::Torn),
            Err(e) => return Err(e.into()),
        }

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            return Err(StorageError::Corrupt {
                offset,
                reason: format!(
                    "crc mismatch (expected {expected_crc:#010x}, found {actual_crc:#010x})"
                ),
            });
        }

        Ok(Frame::Complete {
            payload,
            next: frame_end,
        })
    }
}
