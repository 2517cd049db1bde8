//! Content buffers: the opaque payload attached to a message.
//!
//! Small payloads stay in memory; payloads past the fast-buffering
//! threshold spill to a uniquely-named temp file under the configured
//! folder. The file is removed when the buffer is dropped. The factory
//! ([`Content::for_length`]) retains nothing; the caller owns the buffer.

use std::fmt;
use std::io::{Cursor, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::options::StreamOptions;

/// Monotonic component of spilled-content file names.
static NEXT_CONTENT_ID: AtomicU64 = AtomicU64::new(1);

/// A seekable byte buffer holding a message's content.
pub enum Content {
    /// No content (count 0). Costs nothing.
    Empty,
    /// In-memory buffer for content at or below the fast threshold.
    Memory(Cursor<Vec<u8>>),
    /// Temp-file-backed buffer for spilled content.
    File(FileContent),
}

/// The file-backed variant: an open handle plus the path guard that
/// unlinks the file on drop.
pub struct FileContent {
    file: tokio::fs::File,
    path: TempPath,
    pos: u64,
    len: u64,
}

impl Content {
    /// The shared empty buffer.
    pub fn empty() -> Self {
        Content::Empty
    }

    /// An in-memory buffer over `bytes`, positioned at offset 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Content::Memory(Cursor::new(bytes.into()))
    }

    /// Allocates a buffer for `declared` bytes of incoming content.
    ///
    /// 0 yields [`Content::Empty`]; up to `max_fast_buffering` yields an
    /// in-memory buffer; anything larger opens a uniquely-named temp file
    /// under `temp_content_folder`.
    pub async fn for_length(declared: u64, options: &StreamOptions) -> std::io::Result<Self> {
        if declared == 0 {
            return Ok(Content::Empty);
        }
        if declared <= options.max_fast_buffering {
            return Ok(Content::Memory(Cursor::new(Vec::with_capacity(
                declared as usize,
            ))));
        }

        let folder = options.temp_content_folder.clone();
        let id = NEXT_CONTENT_ID.fetch_add(1, Ordering::Relaxed);
        let named = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&folder)?;
            tempfile::Builder::new()
                .prefix(&format!("room-content-{id:08}-"))
                .suffix(".bin")
                .tempfile_in(&folder)
        })
        .await
        .map_err(std::io::Error::other)??;

        let (file, path) = named.into_parts();
        Ok(Content::File(FileContent {
            file: tokio::fs::File::from_std(file),
            path,
            pos: 0,
            len: 0,
        }))
    }

    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Content::Empty => 0,
            Content::Memory(cursor) => cursor.get_ref().len() as u64,
            Content::File(f) => f.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when the content spilled to a temp file.
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Content::File(_))
    }

    /// Path of the backing temp file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Content::File(f) => Some(&f.path),
            _ => None,
        }
    }

    /// Reads from the current position into `buf`; 0 at end of content.
    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Content::Empty => Ok(0),
            Content::Memory(cursor) => std::io::Read::read(cursor, buf),
            Content::File(f) => {
                let n = f.file.read(buf).await?;
                f.pos += n as u64;
                Ok(n)
            }
        }
    }

    /// Writes all of `bytes` at the current position.
    ///
    /// Writing to [`Content::Empty`] promotes it to an in-memory buffer.
    pub async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Content::Empty => {
                if !bytes.is_empty() {
                    let mut cursor = Cursor::new(bytes.to_vec());
                    cursor.set_position(bytes.len() as u64);
                    *self = Content::Memory(cursor);
                }
                Ok(())
            }
            Content::Memory(cursor) => std::io::Write::write_all(cursor, bytes),
            Content::File(f) => {
                f.file.write_all(bytes).await?;
                f.pos += bytes.len() as u64;
                f.len = f.len.max(f.pos);
                Ok(())
            }
        }
    }

    /// Repositions the buffer at offset 0.
    pub async fn rewind(&mut self) -> std::io::Result<()> {
        match self {
            Content::Empty => Ok(()),
            Content::Memory(cursor) => {
                cursor.set_position(0);
                Ok(())
            }
            Content::File(f) => {
                f.file.flush().await?;
                f.file.seek(SeekFrom::Start(0)).await?;
                f.pos = 0;
                Ok(())
            }
        }
    }

    /// Rewinds and reads the whole content into an owned vector.
    pub async fn bytes(&mut self) -> std::io::Result<Vec<u8>> {
        self.rewind().await?;
        let mut out = Vec::with_capacity(self.len() as usize);
        let mut buf = [0u8; 8 * 1024];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Empty
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => f.write_str("Content::Empty"),
            Content::Memory(cursor) => f
                .debug_struct("Content::Memory")
                .field("len", &cursor.get_ref().len())
                .finish(),
            Content::File(fc) => f
                .debug_struct("Content::File")
                .field("len", &fc.len)
                .field("path", &fc.path.display().to_string())
                .finish(),
        }
    }
}
