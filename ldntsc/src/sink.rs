//! Outputs for decoded frames and audio.

use std::io::Write;

use crate::{
    audio::StereoSample,
    frame::Frame,
    io::encode_samples,
};

pub trait DecodeSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error>;

    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error>;

    fn flush(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

impl<T> DecodeSink for &mut T
where
    T: DecodeSink + ?Sized,
{
    #[inline]
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        (&mut **self).write_frame(frame)
    }

    #[inline]
    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error> {
        (&mut **self).write_audio(samples)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), std::io::Error> {
        (&mut **self).flush()
    }
}

impl<T> DecodeSink for Box<T>
where
    T: DecodeSink + ?Sized,
{
    #[inline]
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        (&mut **self).write_frame(frame)
    }

    #[inline]
    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error> {
        (&mut **self).write_audio(samples)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), std::io::Error> {
        (&mut **self).flush()
    }
}

/// Writes frames and audio as raw little-endian `u16` streams.
///
/// Output to a missing writer is dropped.
#[derive(derive_more::Debug)]
pub struct RawSink<V, A> {
    #[debug(skip)]
    video: Option<V>,
    #[debug(skip)]
    audio: Option<A>,
    buffer: Vec<u8>,
}

impl<V, A> RawSink<V, A> {
    pub fn new(video: Option<V>, audio: Option<A>) -> Self {
        Self {
            video,
            audio,
            buffer: vec![],
        }
    }

    pub fn into_inner(self) -> (Option<V>, Option<A>) {
        (self.video, self.audio)
    }
}

impl<V: Write, A: Write> DecodeSink for RawSink<V, A> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        if let Some(video) = &mut self.video {
            self.buffer.clear();
            encode_samples(frame.as_slice(), &mut self.buffer);
            video.write_all(&self.buffer)?;
        }
        Ok(())
    }

    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error> {
        if let Some(audio) = &mut self.audio {
            self.buffer.clear();
            encode_samples(samples, &mut self.buffer);
            audio.write_all(&self.buffer)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), std::io::Error> {
        if let Some(video) = &mut self.video {
            video.flush()?;
        }
        if let Some(audio) = &mut self.audio {
            audio.flush()?;
        }
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
    pub audio: Vec<StereoSample>,

    /// Length of every audio block written.
    pub audio_blocks: Vec<usize>,
}

impl DecodeSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error> {
        self.audio.extend_from_slice(samples);
        self.audio_blocks.push(samples.len());
        Ok(())
    }
}

/// Forwards to another sink and remembers the last frame.
#[derive(Debug)]
pub struct KeepLastFrame<S> {
    inner: S,
    last: Option<Frame>,
}

impl<S> KeepLastFrame<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, last: None }
    }

    #[inline]
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DecodeSink> DecodeSink for KeepLastFrame<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        self.inner.write_frame(frame)?;
        match &mut self.last {
            Some(last) => last.clone_from(frame),
            None => self.last = Some(frame.clone()),
        }
        Ok(())
    }

    #[inline]
    fn write_audio(&mut self, samples: &[StereoSample]) -> Result<(), std::io::Error> {
        self.inner.write_audio(samples)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), std::io::Error> {
        self.inner.flush()
    }
}
