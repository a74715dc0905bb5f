//! Command line and session configuration

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::data::pack::{PackConstellationsArgs, PackStarsArgs};
use crate::data::DEFAULT_CHUNK_SIZE;
use crate::renderer::{QualityProfile, QualityTier, ToneMapping};

#[derive(Parser, Debug, Clone)]
#[command(name = "nightsky", version, about = "Real-time night sky over a city skyline")]
pub struct Cli {
    /// Directory holding stars.bin, constellations.bin and their metadata
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Rendering quality: auto, low, medium or high
    #[arg(long, default_value = "auto")]
    pub quality: QualityChoice,

    /// Tone mapping: auto, reinhard or soft-clip
    #[arg(long, default_value = "auto")]
    pub tone_mapping: ToneChoice,

    /// Freeze the sky at this instant (RFC 3339) instead of following the clock
    #[arg(long)]
    pub time: Option<DateTime<Utc>>,

    /// Start with constellation lines hidden
    #[arg(long)]
    pub hide_constellations: bool,

    /// Read size for the star stream, in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack a star CSV into stars.bin and stars-meta.json
    PackStars(PackStarsArgs),
    /// Resolve constellation lines into constellations.bin and its metadata
    PackConstellations(PackConstellationsArgs),
}

/// `--quality`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityChoice {
    Auto,
    Fixed(QualityTier),
}

impl QualityChoice {
    /// Profile for the adapter's device type when `Auto`.
    pub fn resolve(self, device_type: wgpu::DeviceType) -> QualityProfile {
        let tier = match self {
            QualityChoice::Auto => QualityTier::from_device_type(device_type),
            QualityChoice::Fixed(tier) => tier,
        };
        QualityProfile::for_tier(tier)
    }
}

impl FromStr for QualityChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(QualityChoice::Auto);
        }
        s.parse().map(QualityChoice::Fixed)
    }
}

/// `--tone-mapping`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneChoice {
    Auto,
    Fixed(ToneMapping),
}

impl ToneChoice {
    /// `None` lets the renderer pick from the target format.
    pub fn fixed(self) -> Option<ToneMapping> {
        match self {
            ToneChoice::Auto => None,
            ToneChoice::Fixed(mapping) => Some(mapping),
        }
    }
}

impl FromStr for ToneChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ToneChoice::Auto);
        }
        s.parse().map(ToneChoice::Fixed)
    }
}

/// Source of the instant the sky is drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyClock {
    Live,
    Fixed(DateTime<Utc>),
}

impl SkyClock {
    pub fn from_option(time: Option<DateTime<Utc>>) -> Self {
        time.map_or(SkyClock::Live, SkyClock::Fixed)
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            SkyClock::Live => Utc::now(),
            SkyClock::Fixed(time) => *time,
        }
    }
}

/// Settings for a viewer session
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub quality: QualityChoice,
    pub tone_mapping: ToneChoice,
    pub clock: SkyClock,
    pub show_constellations: bool,
    pub chunk_size: usize,
}

impl From<&Cli> for ViewerConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            data_dir: cli.data_dir.clone(),
            quality: cli.quality,
            tone_mapping: cli.tone_mapping,
            clock: SkyClock::from_option(cli.time),
            show_constellations: !cli.hide_constellations,
            chunk_size: cli.chunk_size.max(crate::data::RECORD_SIZE),
        }
    }
}
