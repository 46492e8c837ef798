//! Blocking decode loop over raw input streams.

use std::io::Read;

use crate::{
    audio::{
        AudioWindow,
        RawAudioFrame,
    },
    decoder::{
        DecodeStats,
        Decoder,
    },
    io::{
        RawReader,
        ReadError,
    },
    sink::DecodeSink,
};

/// Video samples per buffer.
pub const VIDEO_CHUNK: usize = 16384;

/// Audio frames per buffer.
pub const AUDIO_CHUNK: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("failed to read video input")]
    Video(#[source] ReadError),

    #[error("failed to read audio input")]
    Audio(#[source] ReadError),

    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}

/// Whether a refill ended the stream.
enum Refill {
    Filled,
    Exhausted,
}

fn refill(
    result: Result<(), ReadError>,
    map_err: fn(ReadError) -> DriveError,
) -> Result<Refill, DriveError> {
    match result {
        Ok(()) => Ok(Refill::Filled),
        Err(ReadError::Exhausted { num_samples_read }) => {
            tracing::debug!(num_samples_read, "input exhausted");
            Ok(Refill::Exhausted)
        }
        Err(error) => Err(map_err(error)),
    }
}

#[derive(derive_more::Debug)]
pub struct Driver<V, A, S> {
    video: RawReader<V, u16>,
    audio: Option<RawReader<A, RawAudioFrame>>,
    #[debug(skip)]
    sink: S,
    decoder: Decoder,
    limit: Option<u64>,

    #[debug(skip)]
    video_buffer: Vec<u16>,
    #[debug(skip)]
    audio_buffer: Vec<RawAudioFrame>,

    /// Absolute index of `audio_buffer[0]`.
    audio_start: u64,
}

impl<V: Read, A: Read, S: DecodeSink> Driver<V, A, S> {
    /// Creates a driver. The decoder gets audio enabled if an audio stream is
    /// given.
    pub fn new(video: V, audio: Option<A>, sink: S, mut decoder: Decoder) -> Self {
        if audio.is_some() && !decoder.has_audio() {
            decoder = decoder.with_audio();
        }

        Self {
            video: RawReader::new(video),
            audio: audio.map(RawReader::new),
            sink,
            decoder,
            limit: None,
            video_buffer: vec![],
            audio_buffer: vec![],
            audio_start: 0,
        }
    }

    /// Stops after `limit` input samples were consumed.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[inline]
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Decodes until the input is exhausted or the limit is reached.
    pub fn run(&mut self) -> Result<DecodeStats, DriveError> {
        if let Refill::Filled = self.initial_fill()? {
            loop {
                if self
                    .limit
                    .is_some_and(|limit| self.decoder.position() >= limit)
                {
                    tracing::info!(limit = self.limit, "length limit reached");
                    break;
                }

                let window = self.audio.as_ref().map(|_| {
                    AudioWindow {
                        start: self.audio_start,
                        frames: &self.audio_buffer,
                    }
                });
                let consumed =
                    self.decoder
                        .process(&self.video_buffer, window.as_ref(), &mut self.sink)?;

                if let Refill::Exhausted = self.carry_over_video(consumed)? {
                    break;
                }
                if let Refill::Exhausted = self.carry_over_audio()? {
                    break;
                }
            }
        }

        self.finish()?;

        let stats = self.decoder.stats();
        tracing::info!(?stats, "decoding finished");
        Ok(stats)
    }

    /// Writes out buffered audio and flushes the sink.
    pub fn finish(&mut self) -> Result<(), DriveError> {
        self.decoder.finish(&mut self.sink)?;
        Ok(())
    }

    fn initial_fill(&mut self) -> Result<Refill, DriveError> {
        self.video_buffer.resize(VIDEO_CHUNK, 0);
        if let Refill::Exhausted =
            refill(self.video.fill(&mut self.video_buffer), DriveError::Video)?
        {
            return Ok(Refill::Exhausted);
        }

        if let Some(audio) = &mut self.audio {
            self.audio_buffer.resize(AUDIO_CHUNK, RawAudioFrame::default());
            return refill(audio.fill(&mut self.audio_buffer), DriveError::Audio);
        }
        Ok(Refill::Filled)
    }

    fn carry_over_video(&mut self, consumed: usize) -> Result<Refill, DriveError> {
        let keep = self.video_buffer.len() - consumed;
        self.video_buffer.copy_within(consumed.., 0);
        refill(
            self.video.fill(&mut self.video_buffer[keep..]),
            DriveError::Video,
        )
    }

    fn carry_over_audio(&mut self) -> Result<Refill, DriveError> {
        let Some(audio) = &mut self.audio
        else {
            return Ok(Refill::Filled);
        };

        let retain_from = self.decoder.audio_retain_from();
        if retain_from <= self.audio_start {
            return Ok(Refill::Filled);
        }

        let drop = retain_from - self.audio_start;
        let length = self.audio_buffer.len() as u64;
        self.audio_start = retain_from;

        if drop < length {
            let drop = drop as usize;
            self.audio_buffer.copy_within(drop.., 0);
            let keep = self.audio_buffer.len() - drop;
            refill(audio.fill(&mut self.audio_buffer[keep..]), DriveError::Audio)
        }
        else {
            if let Refill::Exhausted = refill(audio.skip(drop - length), DriveError::Audio)? {
                return Ok(Refill::Exhausted);
            }
            refill(audio.fill(&mut self.audio_buffer), DriveError::Audio)
        }
    }
}
