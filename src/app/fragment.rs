//! Sequential file fragmentation
//!
//! A [`Fragmenter`] owns the open source file and reads it front to back in
//! `fragment_size` windows. Only one fragment is held in memory at a time.

use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::app::models::{fragment_count, Fragment};
use crate::errors::TransferError;

/// Lazy reader producing [`Fragment`]s in index order
#[derive(Debug)]
pub struct Fragmenter {
    file: File,
    file_size: u64,
    fragment_size: u64,
    next_index: u64,
}

impl Fragmenter {
    /// Opens `path` for fragmentation
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the file cannot be opened or is empty
    pub async fn open(path: &Path, fragment_size: u64) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let file_size = file.metadata().await?.len();
        if file_size == 0 {
            return Err(TransferError::EmptyFile {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::new(file, file_size, fragment_size))
    }

    /// Wraps an already-open file of `file_size` bytes
    pub fn new(file: File, file_size: u64, fragment_size: u64) -> Self {
        Self {
            file,
            file_size,
            fragment_size,
            next_index: 0,
        }
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// `ceil(file_size / fragment_size)`
    pub fn fragment_count(&self) -> u64 {
        fragment_count(self.file_size, self.fragment_size)
    }

    /// Reads the next fragment, or `None` once the file is exhausted
    ///
    /// # Errors
    ///
    /// Returns `TransferError::ShortRead` if the file ends before the
    /// expected fragment length.
    pub async fn next_fragment(&mut self) -> Result<Option<Fragment>, TransferError> {
        if self.next_index >= self.fragment_count() {
            return Ok(None);
        }

        let index = self.next_index;
        let offset = index * self.fragment_size;
        let expected = self.fragment_size.min(self.file_size - offset);

        let mut buffer = Vec::with_capacity(usize::try_from(expected).unwrap_or_default());
        let read = (&mut self.file)
            .take(expected)
            .read_to_end(&mut buffer)
            .await?;
        let read = read as u64;
        if read != expected {
            return Err(TransferError::ShortRead {
                index,
                expected,
                actual: read,
            });
        }

        self.next_index += 1;
        Ok(Some(Fragment {
            index,
            offset,
            length: expected,
            payload: Bytes::from(buffer),
        }))
    }

    /// Turns the fragmenter into a finite, non-restartable stream
    pub fn into_stream(self) -> impl Stream<Item = Result<Fragment, TransferError>> {
        stream::try_unfold(self, |mut fragmenter| async move {
            Ok(fragmenter
                .next_fragment()
                .await?
                .map(|fragment| (fragment, fragmenter)))
        })
    }
}
