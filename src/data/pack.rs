//! Offline catalog packing
//!
//! Converts text catalogs into the binary star and constellation files the
//! viewer streams at runtime.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use super::catalog::{
    ConstellationMeta, ConstellationSegment, StarMeta, StarRecord, CONSTELLATIONS_BIN,
    CONSTELLATIONS_META, STARS_BIN, STARS_META,
};

/// B−V used when a catalog row has none (roughly solar)
pub const DEFAULT_BV: f32 = 0.65;

#[derive(Args, Debug, Clone)]
pub struct PackStarsArgs {
    /// CSV with columns hip,ra_deg,dec_deg,mag,bv
    #[arg(long)]
    pub input: PathBuf,
    /// Directory receiving stars.bin and stars-meta.json
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,
    /// Drop stars fainter than this magnitude
    #[arg(long)]
    pub max_magnitude: Option<f32>,
}

#[derive(Args, Debug, Clone)]
pub struct PackConstellationsArgs {
    /// Constellation lines: intermediate JSON, or CSV with columns abbr,hip1,hip2
    #[arg(long)]
    pub lines: PathBuf,
    /// Star CSV used to resolve HIP identifiers
    #[arg(long)]
    pub stars: PathBuf,
    /// Directory receiving constellations.bin and constellations-meta.json
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,
    /// Also write the grouped intermediate JSON here
    #[arg(long)]
    pub write_intermediate: Option<PathBuf>,
}

/// One row of the source star catalog
#[derive(Debug, Clone, Deserialize)]
pub struct StarRow {
    pub hip: Option<u32>,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub mag: f64,
    pub bv: Option<f64>,
}

impl StarRow {
    fn is_finite(&self) -> bool {
        self.ra_deg.is_finite() && self.dec_deg.is_finite() && self.mag.is_finite()
    }
}

/// One row of the raw constellation line CSV
#[derive(Debug, Clone, Deserialize)]
pub struct LineRow {
    pub abbr: String,
    pub hip1: u32,
    pub hip2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HipPair {
    pub hip1: u32,
    pub hip2: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationLines {
    pub abbr: String,
    pub lines: Vec<HipPair>,
}

/// Intermediate constellation JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationFile {
    pub constellations: Vec<ConstellationLines>,
    pub total_lines: u32,
}

fn progress_bar(len: u64, label: &'static str) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::with_template("{msg:>14} {bar:40.cyan/blue} {pos}/{len} {percent}%")?
            .progress_chars("##-"),
    );
    progress.set_message(label);
    Ok(progress)
}

pub fn read_star_rows(path: &Path) -> Result<Vec<StarRow>> {
    log::info!("Reading star catalog {:?}", path);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open star catalog: {:?}", path))?;

    let mut rows = Vec::new();
    for (line, row) in reader.deserialize::<StarRow>().enumerate() {
        let row = row.with_context(|| format!("Bad star row {} in {:?}", line + 2, path))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Filter, convert and sort catalog rows (brightest first).
pub fn pack_star_rows(rows: &[StarRow], max_magnitude: Option<f32>) -> (Vec<StarRecord>, StarMeta) {
    let limit = max_magnitude.map(f64::from).unwrap_or(f64::INFINITY);
    let mut records: Vec<StarRecord> = rows
        .iter()
        .filter(|row| row.is_finite() && row.mag <= limit)
        .map(|row| StarRecord {
            ra: row.ra_deg.to_radians() as f32,
            dec: row.dec_deg.to_radians() as f32,
            magnitude: row.mag as f32,
            bv: row
                .bv
                .filter(|bv| bv.is_finite())
                .map(|bv| bv as f32)
                .unwrap_or(DEFAULT_BV),
        })
        .collect();
    records.sort_by(|a, b| a.magnitude.total_cmp(&b.magnitude));

    let mut meta = StarMeta {
        star_count: records.len() as u32,
        min_magnitude: 0.0,
        max_magnitude: 0.0,
        min_bv: 0.0,
        max_bv: 0.0,
    };
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        meta.min_magnitude = first.magnitude;
        meta.max_magnitude = last.magnitude;
        meta.min_bv = records.iter().map(|r| r.bv).fold(f32::INFINITY, f32::min);
        meta.max_bv = records.iter().map(|r| r.bv).fold(f32::NEG_INFINITY, f32::max);
    }
    (records, meta)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))
}

fn write_binary(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        BufWriter::new(File::create(path).with_context(|| format!("Failed to create {:?}", path))?);
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .with_context(|| format!("Failed to write {:?}", path))
}

pub fn run_pack_stars(args: PackStarsArgs) -> Result<StarMeta> {
    let rows = read_star_rows(&args.input)?;
    let (records, meta) = pack_star_rows(&rows, args.max_magnitude);
    log::info!(
        "Packing {} of {} stars ({} dropped)",
        records.len(),
        rows.len(),
        rows.len() - records.len()
    );

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {:?}", args.out_dir))?;

    let progress = progress_bar(records.len() as u64, "stars")?;
    let mut bytes = Vec::with_capacity(records.len() * super::RECORD_SIZE);
    for record in &records {
        record.write_le_bytes(&mut bytes);
        progress.inc(1);
    }
    progress.finish_and_clear();

    write_binary(&args.out_dir.join(STARS_BIN), &bytes)?;
    write_json(&args.out_dir.join(STARS_META), &meta)?;
    log::info!("Wrote {} stars to {:?}", meta.star_count, args.out_dir);
    Ok(meta)
}

/// Group raw line rows by constellation, keeping first-seen order.
pub fn group_line_rows(rows: Vec<LineRow>) -> ConstellationFile {
    let mut constellations: Vec<ConstellationLines> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let slot = *index.entry(row.abbr.clone()).or_insert_with(|| {
            constellations.push(ConstellationLines {
                abbr: row.abbr.clone(),
                lines: Vec::new(),
            });
            constellations.len() - 1
        });
        constellations[slot].lines.push(HipPair {
            hip1: row.hip1,
            hip2: row.hip2,
        });
    }
    let total_lines = constellations.iter().map(|c| c.lines.len() as u32).sum();
    ConstellationFile {
        constellations,
        total_lines,
    }
}

/// Read constellation lines from intermediate JSON (`.json`) or raw CSV.
pub fn read_constellation_lines(path: &Path) -> Result<ConstellationFile> {
    log::info!("Reading constellation lines {:?}", path);
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    if is_json {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        return serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {:?}", path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    let rows = reader
        .deserialize::<LineRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Bad line row in {:?}", path))?;
    Ok(group_line_rows(rows))
}

/// Result of resolving HIP pairs to coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConstellations {
    pub segments: Vec<ConstellationSegment>,
    pub meta: ConstellationMeta,
    /// Segments dropped for an unknown endpoint
    pub dropped: usize,
}

/// Map every HIP pair to coordinates, dropping pairs with an unknown star.
pub fn resolve_constellations(
    file: &ConstellationFile,
    positions: &HashMap<u32, (f32, f32)>,
) -> ResolvedConstellations {
    let mut segments = Vec::new();
    let mut dropped = 0;
    let mut constellation_count = 0;

    for constellation in &file.constellations {
        let before = segments.len();
        for pair in &constellation.lines {
            match (positions.get(&pair.hip1), positions.get(&pair.hip2)) {
                (Some(&(ra1, dec1)), Some(&(ra2, dec2))) => segments.push(ConstellationSegment {
                    ra1,
                    dec1,
                    ra2,
                    dec2,
                }),
                _ => {
                    log::debug!(
                        "{}: dropping HIP {} - HIP {} (star not in catalog)",
                        constellation.abbr,
                        pair.hip1,
                        pair.hip2
                    );
                    dropped += 1;
                }
            }
        }
        if segments.len() > before {
            constellation_count += 1;
        }
    }

    let meta = ConstellationMeta {
        line_count: segments.len() as u32,
        constellation_count,
    };
    ResolvedConstellations {
        segments,
        meta,
        dropped,
    }
}

/// HIP id → (ra, dec) in radians
pub fn hip_positions(rows: &[StarRow]) -> HashMap<u32, (f32, f32)> {
    rows.iter()
        .filter(|row| row.is_finite())
        .filter_map(|row| {
            row.hip.map(|hip| {
                (
                    hip,
                    (
                        row.ra_deg.to_radians() as f32,
                        row.dec_deg.to_radians() as f32,
                    ),
                )
            })
        })
        .collect()
}

pub fn run_pack_constellations(args: PackConstellationsArgs) -> Result<ConstellationMeta> {
    let lines = read_constellation_lines(&args.lines)?;
    if let Some(path) = &args.write_intermediate {
        write_json(path, &lines)?;
        log::info!("Wrote intermediate constellation lines to {:?}", path);
    }

    let rows = read_star_rows(&args.stars)?;
    let positions = hip_positions(&rows);
    if positions.is_empty() {
        return Err(anyhow!("star catalog {:?} has no HIP identifiers", args.stars));
    }

    let resolved = resolve_constellations(&lines, &positions);
    if resolved.dropped > 0 {
        log::warn!(
            "Dropped {} of {} segments with unresolvable endpoints",
            resolved.dropped,
            lines.total_lines
        );
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {:?}", args.out_dir))?;

    let progress = progress_bar(resolved.segments.len() as u64, "constellations")?;
    let mut bytes = Vec::with_capacity(resolved.segments.len() * super::RECORD_SIZE);
    for segment in &resolved.segments {
        segment.write_le_bytes(&mut bytes);
        progress.inc(1);
    }
    progress.finish_and_clear();

    write_binary(&args.out_dir.join(CONSTELLATIONS_BIN), &bytes)?;
    write_json(&args.out_dir.join(CONSTELLATIONS_META), &resolved.meta)?;
    log::info!(
        "Wrote {} segments across {} constellations to {:?}",
        resolved.meta.line_count,
        resolved.meta.constellation_count,
        args.out_dir
    );
    Ok(resolved.meta)
}
