use crate::{
    INPUT_LINE_LENGTH,
    WINDOW_STRETCH,
    audio::{
        AUDIO_RATIO,
        AudioSynchronizer,
        AudioWindow,
    },
    config::DecoderConfig,
    filter::{
        Reset,
        Scanner,
    },
    frame::{
        Frame,
        output_row,
    },
    level::{
        BLACK_IRE,
        ire_to_sample,
    },
    phase_lock::{
        PhaseLock,
        PhaseTarget,
        write_row,
    },
    sink::DecodeSink,
    sync::{
        Pulse,
        PulseDetector,
        SyncState,
        Transition,
    },
};

/// Samples at the end of a buffer that are never scanned, so the window of the
/// last line found is always complete.
pub const SCAN_MARGIN: usize = 2048;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub lines_decoded: u64,
    pub intervals_rejected: u64,
    pub frames_emitted: u64,
    pub samples_consumed: u64,
}

/// All state of a running decode.
#[derive(derive_more::Debug)]
pub struct Decoder {
    config: DecoderConfig,
    state: SyncState,
    pulses: PulseDetector,
    phase_lock: PhaseLock,
    target: PhaseTarget,
    #[debug(skip)]
    frame: Frame,
    audio: Option<AudioSynchronizer>,

    /// Absolute stream position of the current buffer's first sample.
    position: u64,
    stats: DecodeStats,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            state: SyncState::default(),
            pulses: PulseDetector::new(&config.sync),
            phase_lock: PhaseLock::new(config.phase_lock_passes.max(1)),
            target: PhaseTarget::new(config.sync.phase_hold_line),
            frame: Frame::new(),
            audio: None,
            position: 0,
            stats: DecodeStats::default(),
            config,
        }
    }

    /// Also decodes audio. Requires an [`AudioWindow`] for every call to
    /// [`process`](Self::process).
    pub fn with_audio(mut self) -> Self {
        self.audio = Some(AudioSynchronizer::new());
        self
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> SyncState {
        self.state
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    #[inline]
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    #[inline]
    pub fn audio(&self) -> Option<&AudioSynchronizer> {
        self.audio.as_ref()
    }

    #[inline]
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Absolute stream position of the next buffer.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// First absolute audio frame that the next pass may still read.
    pub fn audio_retain_from(&self) -> u64 {
        let next = self
            .audio
            .as_ref()
            .and_then(AudioSynchronizer::next_position)
            .unwrap_or(self.position as f64 / AUDIO_RATIO);
        (next.floor().max(1.0) - 1.0) as u64
    }

    /// Decodes one buffer of video starting at [`position`](Self::position).
    ///
    /// Returns the number of samples consumed. The caller keeps the rest at the
    /// start of the next buffer.
    pub fn process<S: DecodeSink + ?Sized>(
        &mut self,
        video: &[u16],
        audio: Option<&AudioWindow>,
        sink: &mut S,
    ) -> Result<usize, std::io::Error> {
        let scan_end = video.len().saturating_sub(SCAN_MARGIN);
        self.pulses.reset(f64::from(ire_to_sample(BLACK_IRE)));

        let mut previous: Option<f64> = None;
        for &sample in &video[..scan_end] {
            let Some(pulse) = self.pulses.scan(sample)
            else {
                continue;
            };

            if let Some(prev) = previous.filter(|prev| *prev > 0.0) {
                self.interval(video, prev, pulse, audio, sink)?;
            }
            previous = Some(pulse.crosspoint);
        }

        let lookbehind = self.config.lookbehind as f64;
        let consumed = match previous {
            Some(prev) if prev - lookbehind >= 1.0 => (prev - lookbehind) as usize,
            _ => {
                tracing::debug!(scan_end, "no pulse far enough into the buffer");
                scan_end.saturating_sub(self.config.lookbehind).max(1)
            }
        }
        .min(video.len());

        self.position += consumed as u64;
        self.stats.samples_consumed += consumed as u64;
        Ok(consumed)
    }

    /// Writes out the remaining audio.
    pub fn finish<S: DecodeSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), std::io::Error> {
        if let Some(audio) = &mut self.audio {
            audio.finish(sink)?;
        }
        sink.flush()
    }

    fn interval<S: DecodeSink + ?Sized>(
        &mut self,
        video: &[u16],
        previous: f64,
        pulse: Pulse,
        audio: Option<&AudioWindow>,
        sink: &mut S,
    ) -> Result<(), std::io::Error> {
        let length = pulse.crosspoint - previous;
        let transition = self.state.advance(&self.config.sync, length, pulse.length);

        tracing::trace!(
            position = self.position as f64 + previous,
            length,
            count = pulse.length,
            ?transition,
        );

        match transition {
            Transition::Line { line } => {
                self.decode_line(video, previous, length, line);
            }
            Transition::FieldStart { emit } => {
                if emit && !self.config.audio_only {
                    sink.write_frame(&self.frame)?;
                    self.stats.frames_emitted += 1;
                    tracing::info!(frame = self.stats.frames_emitted, "frame complete");
                }
                else if !emit {
                    tracing::info!("locked to field start");
                }
            }
            Transition::FieldEntered => {
                tracing::info!(state = ?self.state, "locked inside the vertical interval");
            }
            Transition::FirstEdge => {
                tracing::debug!("found first line edge");
            }
            Transition::Rejected => {
                self.stats.intervals_rejected += 1;
            }
            Transition::HalfLine | Transition::FullLine => {}
        }

        if let (Some(synchronizer), Some(window), true) =
            (&mut self.audio, audio, self.state.is_locked())
        {
            let nominal = if self.config.sync.is_half_line(length) {
                INPUT_LINE_LENGTH / 2.0
            }
            else {
                INPUT_LINE_LENGTH
            };
            let offset = self.position as f64;
            synchronizer.advance(
                offset + previous,
                offset + pulse.crosspoint,
                length / nominal,
                window,
                sink,
            )?;
        }

        Ok(())
    }

    fn decode_line(&mut self, video: &[u16], begin: f64, length: f64, line: f64) {
        let end = begin + length * WINDOW_STRETCH;
        let locked = self
            .phase_lock
            .lock(video, begin, end, &mut self.target, line);
        self.stats.lines_decoded += 1;

        let Some(row) = output_row(line)
        else {
            return;
        };

        write_row(&mut self.frame, row, locked.samples, locked.velocity_scale());
        let flag = self.target.phase().unwrap_or_default().flag();
        self.frame.row_mut(row)[0] = flag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sink::MemorySink,
        synth::{
            SynthConfig,
            Synthesizer,
        },
    };

    #[test]
    fn consumes_up_to_the_lookbehind() {
        let mut synth = Synthesizer::new(SynthConfig::default());
        let mut video = vec![];
        synth.lines(10, &mut video);
        video.truncate(16384);

        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut sink = MemorySink::default();
        let consumed = decoder.process(&video, None, &mut sink).unwrap();

        // the last pulse before the scan margin starts line 7
        let last_pulse = 7.0 * 1820.0 + 9.0;
        assert!((consumed as f64 - (last_pulse - 700.0)).abs() < 3.0, "{consumed}");
        assert_eq!(decoder.position(), consumed as u64);
        assert_eq!(decoder.state(), SyncState::SeekingFieldStart);
    }

    #[test]
    fn always_makes_progress() {
        let video = vec![16384u16; 16384];
        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut sink = MemorySink::default();
        let consumed = decoder.process(&video, None, &mut sink).unwrap();
        assert_eq!(consumed, 16384 - SCAN_MARGIN - 700);
        assert_eq!(decoder.state(), SyncState::SeekingFirstEdge);

        let consumed = decoder.process(&video[..100], None, &mut sink).unwrap();
        assert_eq!(consumed, 1);
    }
}
