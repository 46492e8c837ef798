use std::{
    io::Cursor,
    ops::Range,
};

use approx::assert_abs_diff_eq;
use ldntsc::{
    Decoder,
    DecoderConfig,
    Driver,
    audio::{
        RawAudioFrame,
        StereoSample,
    },
    frame::{
        FRAME_HEIGHT,
        Frame,
    },
    io::encode_samples,
    level::{
        BLANKING_IRE,
        ire_to_sample,
    },
    sink::MemorySink,
    synth::{
        HSYNC_WIDTH,
        SLOT_LENGTH,
        SynthConfig,
        Synthesizer,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::SmallRng,
};

const LUMA_COLUMNS: Range<usize> = 150..790;

/// A few lines to find the first edge, one complete frame, and the start of
/// the next one.
fn capture(synth: &mut Synthesizer) -> Vec<u16> {
    let mut video = vec![];
    synth.lines(4, &mut video);
    synth.frame(&mut video);
    synth.frame_slots(0..40, &mut video);
    video
}

fn encoded<S: ldntsc::io::RawSample>(samples: &[S]) -> Cursor<Vec<u8>> {
    let mut bytes = vec![];
    encode_samples(samples, &mut bytes);
    Cursor::new(bytes)
}

fn decode(video: &[u16], audio: Option<&[RawAudioFrame]>, config: DecoderConfig) -> MemorySink {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut driver = Driver::new(
        encoded(video),
        audio.map(encoded),
        MemorySink::default(),
        Decoder::new(config),
    );
    driver.run().unwrap();
    driver.into_sink()
}

/// Shortens the sync pulse ending every line of the frame at `frame_start`
/// that is not in `keep`, so those lines are counted but not decoded.
fn keep_only_lines(video: &mut [u16], frame_start: usize, keep: Range<usize>) {
    for line in (10..=262).chain(272..=524) {
        if !keep.contains(&line) {
            let start = frame_start + 2 * line * SLOT_LENGTH;
            video[start + 86..start + HSYNC_WIDTH].fill(ire_to_sample(BLANKING_IRE));
        }
    }
}

/// Even rows holding lines `lines` of the first field.
fn rows_of(lines: Range<usize>) -> Range<usize> {
    2 * (lines.start - 10)..2 * (lines.end - 10)
}

fn decoded_rows() -> impl Iterator<Item = usize> {
    0..FRAME_HEIGHT - 1
}

fn assert_flat(frame: &Frame, expected: u16, tolerance: u16) {
    for row in decoded_rows() {
        for column in LUMA_COLUMNS {
            let value = frame.get(row, column);
            assert!(
                value.abs_diff(expected) <= tolerance,
                "row {row} column {column}: {value}"
            );
        }
    }
}

#[test]
fn decodes_a_synthetic_frame() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let video = capture(&mut synth);
    let sink = decode(&video, None, DecoderConfig::default());

    assert_eq!(sink.frames.len(), 1);
    let frame = &sink.frames[0];

    assert_flat(frame, ire_to_sample(50.0), 100);

    // the last row is never written
    assert!(frame.row(FRAME_HEIGHT - 1).iter().all(|sample| *sample == 0));

    // column 0 carries the color phase of the row
    for row in decoded_rows() {
        let flag = frame.get(row, 0);
        assert!(flag == 16384 || flag == 32768, "row {row}: {flag}");
    }
    assert!(sink.audio.is_empty());
}

#[test]
fn consecutive_rows_of_a_field_alternate_phase() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let video = capture(&mut synth);
    let frame = &decode(&video, None, DecoderConfig::default()).frames[0];

    // even rows are consecutive lines of the first field
    for row in (20..480).step_by(2) {
        assert_ne!(frame.get(row, 0), frame.get(row + 2, 0), "row {row}");
    }
}

#[test]
fn audio_follows_the_video() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let video = capture(&mut synth);
    let audio = synth.audio(video.len() / 80 + 4096);
    let sink = decode(&video, Some(&audio), DecoderConfig::default());

    assert_eq!(sink.frames.len(), 1);

    // at least one frame worth of audio at 48 kHz
    assert!(sink.audio.len() >= 1590, "{}", sink.audio.len());
    for sample in &sink.audio {
        assert!(sample.left.abs_diff(32768) <= 1, "{sample:?}");
        assert!(sample.right.abs_diff(32768) <= 1, "{sample:?}");
    }
}

#[test]
fn audio_only_suppresses_frames() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let video = capture(&mut synth);
    let audio = synth.audio(video.len() / 80 + 4096);
    let config = DecoderConfig {
        audio_only: true,
        ..Default::default()
    };
    let sink = decode(&video, Some(&audio), config);

    assert!(sink.frames.is_empty());
    assert!(!sink.audio.is_empty());
    assert!(sink.audio.iter().all(|sample| {
        let silence = StereoSample {
            left: 32768,
            right: 32768,
        };
        sample.left.abs_diff(silence.left) <= 1 && sample.right.abs_diff(silence.right) <= 1
    }));
}

#[test]
fn survives_noise() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let mut video = capture(&mut synth);

    let mut rng = SmallRng::seed_from_u64(0x1d);
    for sample in &mut video {
        let noise = rng.gen_range(-500i32..=500);
        *sample = (i32::from(*sample) + noise).clamp(0, 65535) as u16;
    }

    let sink = decode(&video, None, DecoderConfig::default());
    assert_eq!(sink.frames.len(), 1);
    let frame = &sink.frames[0];

    let expected = f64::from(ire_to_sample(50.0));
    assert_flat(frame, ire_to_sample(50.0), 1000);
    for row in decoded_rows() {
        let row = &frame.row(row)[LUMA_COLUMNS];
        let mean = row.iter().map(|s| f64::from(*s)).sum::<f64>() / row.len() as f64;
        assert_abs_diff_eq!(mean, expected, epsilon = 60.0);
    }
}

#[test]
fn brighter_input_decodes_brighter() {
    let mut synth = Synthesizer::new(SynthConfig {
        luma_ire: 80.0,
        ..Default::default()
    });
    let video = capture(&mut synth);
    let frame = &decode(&video, None, DecoderConfig::default()).frames[0];
    assert_flat(frame, ire_to_sample(80.0), 100);
}

#[test]
fn only_decodable_lines_are_written() {
    let mut synth = Synthesizer::new(SynthConfig::default());
    let mut video = capture(&mut synth);
    keep_only_lines(&mut video, 4 * 2 * SLOT_LENGTH, 100..160);

    let sink = decode(&video, None, DecoderConfig::default());
    assert_eq!(sink.frames.len(), 1);
    let frame = &sink.frames[0];

    let lit = rows_of(100..160);
    let expected = ire_to_sample(50.0);
    for row in 0..FRAME_HEIGHT {
        if lit.contains(&row) && row % 2 == 0 {
            for column in LUMA_COLUMNS {
                let value = frame.get(row, column);
                assert!(
                    value.abs_diff(expected) <= 100,
                    "row {row} column {column}: {value}"
                );
            }
        }
        else {
            assert!(
                frame.row(row).iter().all(|sample| *sample == 0),
                "row {row} was written"
            );
        }
    }
}

#[test]
fn skipped_lines_keep_the_previous_frame() {
    let mut synth = Synthesizer::new(SynthConfig {
        luma_ire: 80.0,
        ..Default::default()
    });
    let mut video = vec![];
    synth.lines(4, &mut video);
    synth.frame(&mut video);
    let second_start = video.len();
    synth.set_luma_ire(50.0);
    synth.frame(&mut video);
    synth.frame_slots(0..40, &mut video);
    keep_only_lines(&mut video, second_start, 100..160);

    let sink = decode(&video, None, DecoderConfig::default());
    assert_eq!(sink.frames.len(), 2);
    let (first, second) = (&sink.frames[0], &sink.frames[1]);
    assert_flat(first, ire_to_sample(80.0), 100);

    let lit = rows_of(100..160);
    for row in decoded_rows() {
        if lit.contains(&row) && row % 2 == 0 {
            for column in LUMA_COLUMNS {
                let value = second.get(row, column);
                assert!(
                    value.abs_diff(ire_to_sample(50.0)) <= 100,
                    "row {row} column {column}: {value}"
                );
            }
        }
        else {
            assert_eq!(second.row(row), first.row(row), "row {row}");
        }
    }
    assert!(second.row(FRAME_HEIGHT - 1).iter().all(|sample| *sample == 0));
}
