//! Raw little-endian sample streams.

use std::{
    io::{
        ErrorKind,
        Read,
    },
    marker::PhantomData,
};

use bytemuck::Pod;
use bytes::BufMut;

/// A plain sample type that is stored little-endian in raw streams.
pub trait RawSample: Pod {
    const BYTES: usize = std::mem::size_of::<Self>();

    /// Converts a value read as little-endian bytes to native byte order.
    fn from_le(self) -> Self;

    fn encode(&self, buffer: &mut impl BufMut);
}

impl RawSample for u16 {
    #[inline]
    fn from_le(self) -> Self {
        u16::from_le(self)
    }

    #[inline]
    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_u16_le(*self);
    }
}

impl RawSample for f32 {
    #[inline]
    fn from_le(self) -> Self {
        f32::from_bits(u32::from_le(self.to_bits()))
    }

    #[inline]
    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_f32_le(*self);
    }
}

/// Appends the little-endian encoding of `samples` to `buffer`.
pub fn encode_samples<S: RawSample>(samples: &[S], buffer: &mut Vec<u8>) {
    buffer.reserve(S::BYTES * samples.len());
    for sample in samples {
        sample.encode(buffer);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The stream ended before the buffer could be filled completely.
    #[error("input exhausted after {num_samples_read} samples")]
    Exhausted { num_samples_read: usize },

    #[error("failed to read input")]
    Io(#[from] std::io::Error),
}

/// Blocking reader for raw sample streams.
#[derive(derive_more::Debug)]
pub struct RawReader<R, S> {
    #[debug(skip)]
    reader: R,
    num_samples_read: u64,
    _phantom: PhantomData<fn() -> S>,
}

impl<R, S> RawReader<R, S> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            num_samples_read: 0,
            _phantom: PhantomData,
        }
    }

    /// Total number of samples read so far.
    #[inline]
    pub fn num_samples_read(&self) -> u64 {
        self.num_samples_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read, S: RawSample> RawReader<R, S> {
    /// Fills `buffer` completely, retrying short and interrupted reads.
    ///
    /// If the stream ends first, the samples that could be read are left at
    /// the start of `buffer` and [`ReadError::Exhausted`] is returned.
    pub fn fill(&mut self, buffer: &mut [S]) -> Result<(), ReadError> {
        let result = fill_bytes(&mut self.reader, bytemuck::cast_slice_mut(buffer));
        let num_bytes = match &result {
            Ok(()) => buffer.len() * S::BYTES,
            Err(FillError::Exhausted(num_bytes)) => *num_bytes,
            Err(FillError::Io(_)) => 0,
        };

        let num_samples_read = num_bytes / S::BYTES;
        for sample in &mut buffer[..num_samples_read] {
            *sample = sample.from_le();
        }
        self.num_samples_read += num_samples_read as u64;

        result.map_err(|error| {
            match error {
                FillError::Exhausted(_) => ReadError::Exhausted { num_samples_read },
                FillError::Io(error) => ReadError::Io(error),
            }
        })
    }

    /// Reads and discards `count` samples.
    pub fn skip(&mut self, count: u64) -> Result<(), ReadError> {
        let num_bytes = count * S::BYTES as u64;
        let skipped = std::io::copy(
            &mut (&mut self.reader).take(num_bytes),
            &mut std::io::sink(),
        )?;
        self.num_samples_read += skipped / S::BYTES as u64;

        if skipped < num_bytes {
            Err(ReadError::Exhausted {
                num_samples_read: (skipped / S::BYTES as u64) as usize,
            })
        }
        else {
            Ok(())
        }
    }
}

enum FillError {
    Exhausted(usize),
    Io(std::io::Error),
}

fn fill_bytes(reader: &mut impl Read, buffer: &mut [u8]) -> Result<(), FillError> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => return Err(FillError::Exhausted(filled)),
            Ok(n) => filled += n,
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(FillError::Io(error)),
        }
    }
    Ok(())
}
