use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};

#[derive(Debug, Parser)]
#[clap(version, about = "Laserdisc NTSC composite decoder")]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decodes a raw capture into frames and audio.
    Decode(DecodeArgs),

    /// Writes a synthetic capture.
    Synth(SynthArgs),
}

#[derive(Debug, clap::Args)]
pub struct DecodeArgs {
    /// Raw video capture (little-endian u16 at 8x subcarrier). Defaults to
    /// stdin.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// Raw audio capture (little-endian f32 pairs).
    #[clap(short, long)]
    pub audio: Option<PathBuf>,

    /// Only decode audio and write it to the primary output.
    #[clap(short = 'A', long)]
    pub audio_only: bool,

    /// Frame output. Defaults to stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Audio output when frames are decoded too.
    #[clap(long)]
    pub audio_output: Option<PathBuf>,

    /// Stop after this many input samples.
    #[clap(short, long)]
    pub length: Option<u64>,

    /// TOML file with decoder settings.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Save the last decoded frame as a 16-bit grayscale PNG.
    #[clap(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct SynthArgs {
    /// Video output.
    #[clap(short, long)]
    pub output: PathBuf,

    /// Matching raw audio output.
    #[clap(long)]
    pub audio_output: Option<PathBuf>,

    /// Number of complete frames. The capture is padded so every one of them
    /// decodes.
    #[clap(short, long, default_value = "2")]
    pub frames: usize,

    /// Luminance of active video.
    #[clap(long, default_value = "50")]
    pub ire: f64,

    /// Subcarrier phase at the first sample, in radians.
    #[clap(long, default_value = "0", allow_negative_numbers = true)]
    pub burst_phase: f64,

    /// Amplitude of a 1 kHz test tone on both audio channels.
    #[clap(long, default_value = "0")]
    pub tone: f64,
}
