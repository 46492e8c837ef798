mod args;

use std::{
    fs::File,
    io::{
        BufReader,
        BufWriter,
        Read,
        Write,
    },
    path::Path,
};

use clap::Parser;
use color_eyre::eyre::{
    Error,
    WrapErr,
    bail,
};
use ldntsc::{
    Decoder,
    DecoderConfig,
    Driver,
    driver::AUDIO_CHUNK,
    io::encode_samples,
    sink::{
        DecodeSink,
        KeepLastFrame,
        RawSink,
    },
    synth::{
        SynthConfig,
        Synthesizer,
    },
};
use tracing_subscriber::EnvFilter;

use crate::args::{
    Args,
    Command,
    DecodeArgs,
    SynthArgs,
};

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    // stdout carries frame data
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args);

    match args.command {
        Command::Decode(args) => decode(args),
        Command::Synth(args) => synth(args),
    }
}

fn open(path: &Path) -> Result<Box<dyn Read>, Error> {
    let file = File::open(path).wrap_err_with(|| format!("Could not open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn create(path: &Path) -> Result<Box<dyn Write>, Error> {
    let file =
        File::create(path).wrap_err_with(|| format!("Could not create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn output_or_stdout(path: Option<&Path>) -> Result<Box<dyn Write>, Error> {
    match path {
        Some(path) => create(path),
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

fn load_config(path: Option<&Path>) -> Result<DecoderConfig, Error> {
    let Some(path) = path
    else {
        return Ok(DecoderConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Could not read config {}", path.display()))?;
    let config = toml::from_str(&text)
        .wrap_err_with(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

fn decode(args: DecodeArgs) -> Result<(), Error> {
    if args.audio_only && args.audio.is_none() {
        bail!("--audio-only needs an audio input");
    }
    if args.audio_only && args.audio_output.is_some() {
        bail!("--audio-only writes audio to the primary output, --audio-output can't be used");
    }
    if !args.audio_only && args.audio.is_some() && args.audio_output.is_none() {
        bail!("--audio needs --audio-output, or --audio-only");
    }

    let mut config = load_config(args.config.as_deref())?;
    config.audio_only |= args.audio_only;
    config.validate()?;
    tracing::debug!(?config);

    let video: Box<dyn Read> = match &args.input {
        Some(path) => open(path)?,
        None => Box::new(BufReader::new(std::io::stdin().lock())),
    };
    let audio = args.audio.as_deref().map(open).transpose()?;

    let output = output_or_stdout(args.output.as_deref())?;
    let (video_output, audio_output) = if args.audio_only {
        (None, Some(output))
    }
    else {
        (
            Some(output),
            args.audio_output.as_deref().map(create).transpose()?,
        )
    };
    let sink = RawSink::new(video_output, audio_output);

    match &args.snapshot {
        Some(path) => {
            let sink = drive(video, audio, KeepLastFrame::new(sink), config, args.length)?;
            match sink.last_frame() {
                Some(frame) => {
                    frame
                        .to_image()
                        .save(path)
                        .wrap_err_with(|| format!("Could not save snapshot {}", path.display()))?;
                }
                None => tracing::warn!("no frame decoded, snapshot not written"),
            }
        }
        None => {
            drive(video, audio, sink, config, args.length)?;
        }
    }

    Ok(())
}

fn drive<S: DecodeSink>(
    video: Box<dyn Read>,
    audio: Option<Box<dyn Read>>,
    sink: S,
    config: DecoderConfig,
    length: Option<u64>,
) -> Result<S, Error> {
    let mut driver = Driver::new(video, audio, sink, Decoder::new(config));
    if let Some(length) = length {
        driver = driver.with_limit(length);
    }

    let stats = driver.run()?;
    tracing::info!(
        frames = stats.frames_emitted,
        lines = stats.lines_decoded,
        rejected = stats.intervals_rejected,
        "done"
    );

    Ok(driver.into_sink())
}

fn synth(args: SynthArgs) -> Result<(), Error> {
    let config = SynthConfig {
        luma_ire: args.ire,
        burst_phase: args.burst_phase,
        tone_amplitude: args.tone,
        ..Default::default()
    };
    let mut synth = Synthesizer::new(config);

    let mut output = create(&args.output)?;
    let mut samples = vec![];
    let mut bytes = vec![];
    let mut write = |samples: &mut Vec<u16>| -> Result<(), Error> {
        bytes.clear();
        encode_samples(samples.as_slice(), &mut bytes);
        output.write_all(&bytes)?;
        samples.clear();
        Ok(())
    };

    // a few lines to lock onto, the frames, and the start of one more to emit
    // the last frame
    synth.lines(4, &mut samples);
    write(&mut samples)?;
    for _ in 0..args.frames {
        synth.frame(&mut samples);
        write(&mut samples)?;
    }
    synth.frame_slots(0..40, &mut samples);
    write(&mut samples)?;
    output.flush()?;

    let length = synth.position();
    tracing::info!(length, frames = args.frames, "capture written");

    if let Some(path) = &args.audio_output {
        // enough to keep the audio buffer full until the video ends
        let frames = (length / 80) as usize + 2 * AUDIO_CHUNK;
        let mut audio_output = create(path)?;
        bytes.clear();
        encode_samples(&synth.audio(frames), &mut bytes);
        audio_output.write_all(&bytes)?;
        audio_output.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ldntsc::{
        DecoderConfig,
        io::encode_samples,
        sink::MemorySink,
        synth::{
            SynthConfig,
            Synthesizer,
        },
    };

    use super::drive;

    fn capture() -> Vec<u8> {
        let mut synth = Synthesizer::new(SynthConfig::default());
        let mut video = vec![];
        synth.lines(4, &mut video);
        synth.frame(&mut video);
        synth.frame_slots(0..40, &mut video);
        let mut bytes = vec![];
        encode_samples(video.as_slice(), &mut bytes);
        bytes
    }

    #[test]
    fn drives_any_sink() {
        let sink = drive(
            Box::new(Cursor::new(capture())),
            None,
            MemorySink::default(),
            DecoderConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(sink.frames.len(), 1);
    }

    #[test]
    fn limit_is_applied() {
        let sink = drive(
            Box::new(Cursor::new(capture())),
            None,
            MemorySink::default(),
            DecoderConfig::default(),
            Some(100_000),
        )
        .unwrap();
        assert!(sink.frames.is_empty());
    }
}
