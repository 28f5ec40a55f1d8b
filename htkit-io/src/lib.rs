//! # Spillable replay buffers.
//!
//! HTTP request bodies may be read-once streams, but a client that retries a
//! challenged request has to send the body again, and `auth-int` digest
//! protection additionally needs to hash it. The [`BodySpool`] is a
//! write-then-read-once vessel that buffers written bytes in memory and
//! spills to a temporary file once a configured limit is exceeded, and
//! [`duplicate`] tees a read-once [`Body`] into any number of independent
//! replayable bodies.

use std::{
    env, io, mem,
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tempfile::{NamedTempFile, TempPath};
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_util::io::ReaderStream;

use htkit::{Body, Error};

/// A write-then-read-once buffer with memory-to-disk spill.
///
/// Bytes written to the spool are kept in memory until the cumulative length
/// exceeds the configured limit; from then on the buffered prefix and all
/// subsequent bytes live in a temporary file. The spool yields at most one
/// reader, and the temporary file (if any) is removed when that reader is
/// dropped.
pub struct BodySpool {
    limit: Option<usize>,
    dir: Option<PathBuf>,
    buf: BytesMut,
    file: Option<SpoolFile>,
    used: bool,
}

impl BodySpool {
    /// Create a new spool.
    ///
    /// # Arguments
    /// * `dir` - directory for the spill file (`None` means the OS temporary
    ///   directory)
    /// * `limit` - in-memory byte limit (`None` means never spill)
    pub fn new(dir: Option<PathBuf>, limit: Option<usize>) -> Self {
        Self {
            limit,
            dir,
            buf: BytesMut::new(),
            file: None,
            used: false,
        }
    }

    /// Append a given chunk to the spool.
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            return file.inner.write_all(chunk).await;
        }

        self.buf.extend_from_slice(chunk);

        if let Some(limit) = self.limit {
            if self.buf.len() > limit {
                self.spill().await?;
            }
        }

        Ok(())
    }

    /// Move the buffered bytes into a fresh temporary file and direct all
    /// subsequent writes there.
    async fn spill(&mut self) -> io::Result<()> {
        let tmp = match self.dir.as_ref() {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(env::temp_dir())?,
        };

        let (file, path) = tmp.into_parts();

        let mut file = SpoolFile {
            inner: File::from_std(file),
            path,
        };

        file.inner.write_all(&self.buf).await?;

        self.buf.clear();
        self.file = Some(file);

        Ok(())
    }

    /// Signal that no more bytes will be written.
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.inner.flush().await?;
        }

        Ok(())
    }

    /// Take the reader yielding everything written to the spool.
    ///
    /// The reader can be taken only once; any further call returns
    /// [`Error::SpoolExhausted`]. Dropping the returned body removes the
    /// spill file (if one was created).
    pub async fn into_reader(&mut self) -> Result<Body, Error> {
        if self.used {
            return Err(Error::SpoolExhausted);
        }

        self.used = true;

        if let Some(file) = self.file.take() {
            // drop the write handle and open the file again for reading
            let SpoolFile { inner, path } = file;

            mem::drop(inner);

            let reader = File::open(&path).await.map_err(Error::IO)?;

            let stream = SpoolFileStream {
                inner: ReaderStream::new(reader),
                _path: path,
            };

            Ok(Body::from_stream(stream))
        } else {
            Ok(Body::from(mem::take(&mut self.buf)))
        }
    }
}

/// Write handle of a spilled spool.
struct SpoolFile {
    inner: File,
    path: TempPath,
}

/// Byte stream draining a spill file.
///
/// The temporary file is removed when the stream is dropped.
struct SpoolFileStream {
    inner: ReaderStream<File>,
    _path: TempPath,
}

impl Stream for SpoolFileStream {
    type Item = io::Result<Bytes>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Tee a given read-once body into `n` independent replayable bodies.
///
/// The source body is always fully drained. Every chunk is written to `n`
/// spools created by a given factory and the spool readers are returned.
pub async fn duplicate<F>(mut body: Body, n: usize, mut new_spool: F) -> Result<Vec<Body>, Error>
where
    F: FnMut() -> BodySpool,
{
    let mut spools = Vec::with_capacity(n);

    spools.resize_with(n, &mut new_spool);

    while let Some(chunk) = body.next().await.transpose().map_err(Error::IO)? {
        for spool in &mut spools {
            spool.write(&chunk).await.map_err(Error::IO)?;
        }
    }

    let mut clones = Vec::with_capacity(n);

    for spool in &mut spools {
        spool.close().await.map_err(Error::IO)?;

        clones.push(spool.into_reader().await?);
    }

    Ok(clones)
}
