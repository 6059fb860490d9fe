//! Length-prefixed framing shared by controllers and workers.
//!
//! A frame on the wire is a native-width, native-endian `usize` length
//! followed by exactly that many payload bytes. A length of zero carries no
//! payload and marks the end of a logical exchange:
//!
//! - controller → worker: no more tasks, the worker should exit
//! - worker → controller: no more results for the current task
//!
//! Both ends run on the same machine from the same build, so the native
//! layout is all the agreement they need. There is no header beyond the
//! length, no checksum and no version.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Width of the length prefix
pub const FRAME_HEADER_LEN: usize = std::mem::size_of::<usize>();

/// Largest payload either side will accept
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// One unit of the channel protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-empty payload
    Data(Vec<u8>),
    /// Zero-length terminator
    End,
}

impl Frame {
    pub fn data(payload: impl Into<Vec<u8>>) -> Self {
        Frame::Data(payload.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Frame::End)
    }
}

/// Writes frames to a byte sink, flushing after each one
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn send(&mut self, frame: &Frame) -> SearchResult<()> {
        match frame {
            Frame::Data(payload) => self.send_data(payload),
            Frame::End => self.send_end(),
        }
    }

    pub fn send_data(&mut self, payload: &[u8]) -> SearchResult<()> {
        if payload.is_empty() {
            return Err(SearchError::protocol(
                "empty payload would be read as a terminator",
            ));
        }
        if payload.len() > MAX_FRAME_LEN {
            return Err(SearchError::protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                payload.len(),
                MAX_FRAME_LEN
            )));
        }
        self.inner.write_all(&payload.len().to_ne_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn send_end(&mut self) -> SearchResult<()> {
        self.inner.write_all(&0usize.to_ne_bytes())?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads frames from a byte source
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the source is exhausted exactly at a frame
    /// boundary. Running dry inside a frame is a protocol error.
    pub fn read_frame(&mut self) -> SearchResult<Option<Frame>> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let filled = read_full(&mut self.inner, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_HEADER_LEN {
            return Err(SearchError::protocol(format!(
                "truncated frame header ({} of {} bytes)",
                filled, FRAME_HEADER_LEN
            )));
        }

        let len = usize::from_ne_bytes(header);
        if len == 0 {
            return Ok(Some(Frame::End));
        }
        if len > MAX_FRAME_LEN {
            return Err(SearchError::protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_LEN
            )));
        }

        let mut payload = vec![0u8; len];
        let filled = read_full(&mut self.inner, &mut payload)?;
        if filled < len {
            return Err(SearchError::protocol(format!(
                "truncated frame payload ({} of {} bytes)",
                filled, len
            )));
        }
        Ok(Some(Frame::Data(payload)))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Like `read_exact`, but reports how much was read before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encodes a task path for the wire
#[cfg(unix)]
pub fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
pub fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Decodes a task path received from the wire
#[cfg(unix)]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(frames: &[Frame]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        for frame in frames {
            writer.send(frame).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn test_frames_survive_the_wire() {
        let message = b"worker1: notes/a.txt:2:3\n".to_vec();
        let bytes = encode(&[
            Frame::data(message.clone()),
            Frame::data(vec![0u8, 255, 10, 0]),
            Frame::End,
        ]);
        assert_eq!(
            bytes.len(),
            3 * FRAME_HEADER_LEN + message.len() + 4
        );

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap(), Some(Frame::Data(message)));
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(Frame::Data(vec![0u8, 255, 10, 0]))
        );
        assert_eq!(reader.read_frame().unwrap(), Some(Frame::End));
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn test_terminator_is_a_zero_length() {
        let bytes = encode(&[Frame::End]);
        assert_eq!(bytes, 0usize.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_empty_payload_rejected() {
        let mut writer = FrameWriter::new(Vec::new());
        let err = writer.send_data(b"").unwrap_err();
        assert!(matches!(err, SearchError::Protocol(_)));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let mut reader = FrameReader::new(Cursor::new(vec![1u8, 0]));
        let err = reader.read_frame().unwrap_err();
        assert!(err.to_string().contains("truncated frame header"));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = 10usize.to_ne_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(err.to_string().contains("truncated frame payload (5 of 10 bytes)"));
    }

    #[test]
    fn test_oversized_frame() {
        let bytes = (MAX_FRAME_LEN + 1).to_ne_bytes().to_vec();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_frame(),
            Err(SearchError::Protocol(_))
        ));

        let mut writer = FrameWriter::new(Vec::new());
        assert!(writer.send_data(&vec![b'x'; MAX_FRAME_LEN + 1]).is_err());
    }

    #[test]
    fn test_path_bytes() {
        let path = Path::new("dir with spaces/file.txt");
        assert_eq!(path_from_bytes(&path_to_bytes(path)), path);
    }
}
