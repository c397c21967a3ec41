//! Raw frame recorder: concatenates pixel buffers into one file

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::capture::Frame;
use crate::error::{PersistenceError, PipelineError};
use crate::persist::PersistenceSink;

/// Writes each frame's pixel buffer back to back; the file carries no header.
///
/// The file length is always a whole number of frames: a failed append is cut
/// back to the end of the previous frame before the error is returned.
pub struct RawFileSink {
    path: PathBuf,
    writer: Option<File>,
    /// Bytes of complete frames in the current recording
    committed: u64,
    frames_in_recording: u64,
    frames_total: u64,
}

impl RawFileSink {
    /// Prepare a recorder for `path`. The file itself is created on `open`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        if path.as_os_str().is_empty() || path.file_name().is_none() {
            return Err(PipelineError::acquisition(
                "recorder",
                format!("invalid output path {:?}", path),
            ));
        }
        info!("Recorder output: {}", path.display());

        Ok(Self {
            path,
            writer: None,
            committed: 0,
            frames_in_recording: 0,
            frames_total: 0,
        })
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total
    }
}

impl PersistenceSink for RawFileSink {
    fn open(&mut self) -> Result<(), PersistenceError> {
        if self.writer.is_some() {
            return Ok(());
        }
        let open_err = |source| PersistenceError::Open {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = File::create(&self.path).map_err(open_err)?;

        self.writer = Some(file);
        self.committed = 0;
        self.frames_in_recording = 0;
        debug!("Opened {}", self.path.display());
        Ok(())
    }

    fn append(&mut self, frame: &Frame) -> Result<(), PersistenceError> {
        let writer = self.writer.as_mut().ok_or(PersistenceError::NotOpen)?;
        write_aligned(writer, self.committed, &frame.data).map_err(PersistenceError::Write)?;

        self.committed += frame.data.len() as u64;
        self.frames_in_recording += 1;
        self.frames_total += 1;
        debug!(
            "Encoding frame {} ({} bytes)",
            self.frames_total,
            frame.data.len()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        let Some(file) = self.writer.take() else {
            return Ok(());
        };
        file.sync_all().map_err(PersistenceError::Close)?;

        info!(
            "Closed {} after {} frames",
            self.path.display(),
            self.frames_in_recording
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn finalize(&mut self) -> Result<(), PersistenceError> {
        self.close()?;
        info!(
            "Recording finalized for file: {} ({} frames total)",
            self.path.display(),
            self.frames_total
        );
        Ok(())
    }
}

/// Output that can be cut back to a given length
trait Truncate {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write one frame at `committed`. On failure the partial frame is dropped
/// and the cursor moved back, so the next frame starts at a frame boundary.
fn write_aligned<W: Write + Seek + Truncate>(
    out: &mut W,
    committed: u64,
    data: &[u8],
) -> io::Result<()> {
    let Err(e) = out.write_all(data) else {
        return Ok(());
    };
    if let Err(cut) = out
        .truncate(committed)
        .and_then(|_| out.seek(SeekFrom::Start(committed)))
    {
        warn!("Failed to drop partial frame: {}", cut);
    }
    Err(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    /// In-memory output that accepts `limit` bytes in total, then stalls
    struct ShortOutput {
        inner: Cursor<Vec<u8>>,
        limit: usize,
    }

    impl Write for ShortOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit.saturating_sub(self.inner.get_ref().len());
            self.inner.write(&buf[..buf.len().min(room)])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for ShortOutput {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Truncate for ShortOutput {
        fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.inner.get_mut().truncate(len as usize);
            Ok(())
        }
    }

    fn frame(seq: u64, fill: u8) -> Frame {
        Frame::rgb24(seq, 4, 4, vec![fill; 4 * 4 * 3])
    }

    #[test]
    fn writes_concatenated_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.rgb");
        let mut sink = RawFileSink::new(&path).unwrap();

        sink.open().unwrap();
        assert!(sink.is_open());
        for seq in 0..3 {
            sink.append(&frame(seq, seq as u8)).unwrap();
        }
        sink.close().unwrap();
        assert!(!sink.is_open());

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 3 * 4 * 4 * 3);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[bytes.len() - 1], 2);
        assert_eq!(sink.frames_total(), 3);
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut sink = RawFileSink::new(dir.path().join("out.rgb")).unwrap();

        sink.close().unwrap();
        sink.open().unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        sink.finalize().unwrap();
    }

    #[test]
    fn append_requires_open() {
        let dir = tempdir().unwrap();
        let mut sink = RawFileSink::new(dir.path().join("out.rgb")).unwrap();

        assert!(matches!(
            sink.append(&frame(1, 0)),
            Err(PersistenceError::NotOpen)
        ));
    }

    #[test]
    fn reopening_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.rgb");
        let mut sink = RawFileSink::new(&path).unwrap();

        sink.open().unwrap();
        sink.append(&frame(1, 1)).unwrap();
        sink.append(&frame(2, 1)).unwrap();
        sink.close().unwrap();

        sink.open().unwrap();
        sink.append(&frame(3, 9)).unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![9u8; 4 * 4 * 3]);
        assert_eq!(sink.frames_total(), 3);
    }

    #[test]
    fn open_failure_is_reported() {
        let dir = tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let mut sink = RawFileSink::new(blocker.join("out.rgb")).unwrap();

        assert!(matches!(sink.open(), Err(PersistenceError::Open { .. })));
        assert!(!sink.is_open());
    }

    #[test]
    fn rejects_directory_like_paths() {
        assert!(RawFileSink::new("").is_err());
        assert!(RawFileSink::new("/").is_err());
    }

    #[test]
    fn failed_write_keeps_output_frame_aligned() {
        let mut out = ShortOutput {
            inner: Cursor::new(Vec::new()),
            limit: 30,
        };
        let frame = [7u8; 12];

        write_aligned(&mut out, 0, &frame).unwrap();
        write_aligned(&mut out, 12, &frame).unwrap();
        let err = write_aligned(&mut out, 24, &frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);

        assert_eq!(out.inner.get_ref().len(), 24);
        assert_eq!(out.inner.position(), 24);

        // Room for a whole frame again: it lands on the boundary
        out.limit = 36;
        write_aligned(&mut out, 24, &frame).unwrap();
        assert_eq!(out.inner.get_ref(), &vec![7u8; 36]);
    }
}
