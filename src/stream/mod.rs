//! Raw YUV stream container: one ASCII stream header line, then repeated
//! `(frame header line, Y bytes, U bytes, V bytes)` records.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, warn};
use thiserror::Error;

use crate::config;
use crate::modifier::ModifyError;
use crate::video::plane::ChromaFormat;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid stream header: {0}")]
    InvalidHeader(String),
    #[error("unknown YUV format: {payload_len} payload bytes do not split into {width}x{height} frames")]
    UnknownChromaFormat { width: u32, height: u32, payload_len: u64 },
    #[error("truncated frame {index}: expected {expected} bytes, got {got}")]
    TruncatedFrame { index: u64, expected: usize, got: usize },
    #[error(transparent)]
    Modify(#[from] ModifyError),
}

/// The stream's first line, kept verbatim for the output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub width: u32,
    pub height: u32,
    /// Header line without its terminating newline.
    pub raw: String,
}

impl StreamHeader {
    /// Parse `"<tag> W<width> H<height> ..."`. Tokens other than the
    /// dimensions are passed through untouched.
    pub fn parse(line: &str) -> Result<Self, StreamError> {
        let dimension = |prefix: char| {
            line.split_whitespace()
                .skip(1)
                .find_map(|token| token.strip_prefix(prefix)?.parse::<u32>().ok())
        };
        let width = dimension('W')
            .ok_or_else(|| StreamError::InvalidHeader(format!("no W<width> token in {line:?}")))?;
        let height = dimension('H')
            .ok_or_else(|| StreamError::InvalidHeader(format!("no H<height> token in {line:?}")))?;
        if width == 0 || height == 0 {
            return Err(StreamError::InvalidHeader(format!("empty frame size {width}x{height}")));
        }

        // 4:4:4 is the largest layout; every other format fits if it does
        if ChromaFormat::Yuv444
            .checked_frame_data_len(width as usize, height as usize)
            .is_none()
        {
            return Err(StreamError::InvalidHeader(format!("frame size {width}x{height} is too large")));
        }

        let block = config::BLOCK_SIZE as u32;
        if width % block != 0 || height % block != 0 {
            warn!("frame size {width}x{height} is not a multiple of {block}; edge pixels are left unmarked");
        }

        Ok(Self {
            width,
            height,
            raw: line.to_string(),
        })
    }

    /// Bytes the header occupies on disk, newline included.
    pub fn len_on_disk(&self) -> u64 {
        self.raw.len() as u64 + 1
    }
}

/// Pick the chroma format whose per-frame length (plane data plus
/// `frame_header_len`) divides the payload exactly. Candidates are tried
/// in [`ChromaFormat::DETECTION_ORDER`]; the first match wins.
pub fn detect_format(
    total_len: u64,
    header_len: u64,
    frame_header_len: u64,
    width: u32,
    height: u32,
) -> Result<ChromaFormat, StreamError> {
    let payload_len = total_len.saturating_sub(header_len);
    let (w, h) = (width as usize, height as usize);

    let mut frame_lens = Vec::with_capacity(ChromaFormat::DETECTION_ORDER.len());
    for format in ChromaFormat::DETECTION_ORDER {
        let frame_len = format
            .checked_frame_data_len(w, h)
            .and_then(|len| (len as u64).checked_add(frame_header_len))
            .ok_or_else(|| StreamError::InvalidHeader(format!("frame size {width}x{height} is too large")))?;
        frame_lens.push((format, frame_len));
    }

    let mut matches = frame_lens
        .into_iter()
        .filter(|&(_, frame_len)| payload_len % frame_len == 0)
        .map(|(format, _)| format);

    let format = matches.next().ok_or(StreamError::UnknownChromaFormat {
        width,
        height,
        payload_len,
    })?;
    let others: Vec<ChromaFormat> = matches.collect();
    if !others.is_empty() {
        debug!("payload length {payload_len} also fits {others:?}; using {format}");
    }
    Ok(format)
}

/// One frame as stored: its header line and packed plane bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header line without its terminating newline.
    pub header: Vec<u8>,
    pub data: Vec<u8>,
}

/// Sequential and random-access frame reader.
pub struct StreamReader<R> {
    inner: BufReader<R>,
    header: StreamHeader,
    format: ChromaFormat,
    frame_len: u64,
    payload_len: u64,
}

impl StreamReader<File> {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> StreamReader<R> {
    /// Parse the stream header, detect the chroma format and leave the
    /// cursor on the first frame.
    pub fn new(mut inner: R) -> Result<Self, StreamError> {
        let total_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        let mut inner = BufReader::new(inner);

        let line = read_line(&mut inner)?
            .ok_or_else(|| StreamError::InvalidHeader("empty stream".to_string()))?;
        let line = String::from_utf8(line)
            .map_err(|_| StreamError::InvalidHeader("stream header is not valid UTF-8".to_string()))?;
        let header = StreamHeader::parse(&line)?;
        let data_start = header.len_on_disk();

        // every frame header has the same length as the first one
        let frame_header_len = read_line(&mut inner)?.map_or(0, |l| l.len() as u64 + 1);
        inner.seek(SeekFrom::Start(data_start))?;

        let format = detect_format(total_len, data_start, frame_header_len, header.width, header.height)?;
        let frame_data_len = format.frame_data_len(header.width as usize, header.height as usize) as u64;

        Ok(Self {
            inner,
            format,
            frame_len: frame_data_len + frame_header_len,
            payload_len: total_len.saturating_sub(data_start),
            header,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn format(&self) -> ChromaFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.header.width as usize
    }

    pub fn height(&self) -> usize {
        self.header.height as usize
    }

    /// Bytes per frame on disk, header line included.
    pub fn frame_length(&self) -> u64 {
        self.frame_len
    }

    pub fn frame_data_len(&self) -> usize {
        self.format.frame_data_len(self.width(), self.height())
    }

    pub fn frame_count(&self) -> u64 {
        if self.frame_len == 0 {
            0
        } else {
            self.payload_len / self.frame_len
        }
    }

    fn data_start(&self) -> u64 {
        self.header.len_on_disk()
    }

    /// Index of the frame the cursor is positioned on.
    pub fn position(&mut self) -> Result<u64, StreamError> {
        let pos = self.inner.stream_position()?;
        Ok(pos.saturating_sub(self.data_start()) / self.frame_len.max(1))
    }

    /// Read the next frame. A frame cut short by end-of-file is an error.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, StreamError> {
        let index = self.position()?;
        let header = match read_line(&mut self.inner)? {
            Some(line) => line,
            None => return Ok(None),
        };

        let expected = self.frame_data_len();
        let mut data = vec![0u8; expected];
        let got = read_full(&mut self.inner, &mut data)?;
        if got < expected {
            return Err(StreamError::TruncatedFrame {
                index,
                expected,
                got,
            });
        }

        Ok(Some(Frame { header, data }))
    }

    /// Read the next frame, treating a truncated trailing frame as the end
    /// of the stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, StreamError> {
        match self.read_frame() {
            Err(StreamError::TruncatedFrame { index, got, .. }) => {
                debug!("frame {index} truncated after {got} bytes; end of stream");
                Ok(None)
            }
            other => other,
        }
    }

    /// Move the cursor by `delta_frames` whole frames. Positions before the
    /// first frame clamp to it. Returns the new frame index.
    pub fn seek_relative(&mut self, delta_frames: i64) -> Result<u64, StreamError> {
        let pos = self.inner.stream_position()? as i64;
        let target = pos.saturating_add(delta_frames.saturating_mul(self.frame_len as i64));
        let start = self.data_start() as i64;
        if target < start {
            debug!("seek to before the first frame clamped to frame 0");
        }
        self.inner.seek(SeekFrom::Start(target.max(start) as u64))?;
        self.position()
    }

    /// Move the cursor to the start of frame `index`.
    pub fn seek_to_frame(&mut self, index: u64) -> Result<(), StreamError> {
        let target = self.data_start() + index.saturating_mul(self.frame_len);
        self.inner.seek(SeekFrom::Start(target))?;
        Ok(())
    }

    /// Go back to byte 0 and skip the stream header again.
    pub fn rewind_to_start(&mut self) -> Result<(), StreamError> {
        self.inner.seek(SeekFrom::Start(0))?;
        read_line(&mut self.inner)?;
        Ok(())
    }
}

/// Writes a stream: header line first, then frames in order.
pub struct StreamWriter<W: Write> {
    inner: BufWriter<W>,
    frames_written: u64,
}

impl StreamWriter<File> {
    pub fn create(path: &Path, header: &StreamHeader) -> Result<Self, StreamError> {
        Self::new(File::create(path)?, header)
    }
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W, header: &StreamHeader) -> Result<Self, StreamError> {
        let mut inner = BufWriter::new(inner);
        inner.write_all(header.raw.as_bytes())?;
        inner.write_all(b"\n")?;
        Ok(Self {
            inner,
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), StreamError> {
        self.inner.write_all(&frame.header)?;
        self.inner.write_all(b"\n")?;
        self.inner.write_all(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush buffered output and hand back the underlying writer.
    pub fn finish(self) -> Result<W, StreamError> {
        self.inner.into_inner().map_err(|e| StreamError::Io(e.into_error()))
    }
}

/// Whether `path` carries one of the raw YUV stream extensions.
pub fn is_yuv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config::YUV_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Read one `\n`-terminated line, without the newline. `None` at EOF.
fn read_line(reader: &mut impl BufRead) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    Ok(Some(line))
}

/// Fill as much of `buf` as the reader can supply; returns the byte count.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
