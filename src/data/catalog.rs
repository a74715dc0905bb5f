//! Star and constellation catalog formats
//!
//! Binary files are sequences of 16-byte little-endian records of four `f32`.
//! Each binary has a JSON metadata sibling; the star metadata is the
//! authoritative record count.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Size of one star or constellation record in bytes
pub const RECORD_SIZE: usize = 16;

pub const STARS_BIN: &str = "stars.bin";
pub const STARS_META: &str = "stars-meta.json";
pub const CONSTELLATIONS_BIN: &str = "constellations.bin";
pub const CONSTELLATIONS_META: &str = "constellations-meta.json";

/// One catalog star, as stored on disk and in the GPU instance buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StarRecord {
    pub ra: f32,
    pub dec: f32,
    pub magnitude: f32,
    pub bv: f32,
}

/// One constellation line between two catalog stars
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ConstellationSegment {
    pub ra1: f32,
    pub dec1: f32,
    pub ra2: f32,
    pub dec2: f32,
}

fn read_f32s(record: &[u8]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (value, bytes) in out.iter_mut().zip(record.chunks_exact(4)) {
        *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    out
}

fn write_f32s(values: [f32; 4], out: &mut Vec<u8>) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

impl StarRecord {
    /// Decode one record. `bytes` must hold at least `RECORD_SIZE` bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let [ra, dec, magnitude, bv] = read_f32s(&bytes[..RECORD_SIZE]);
        Self {
            ra,
            dec,
            magnitude,
            bv,
        }
    }

    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        write_f32s([self.ra, self.dec, self.magnitude, self.bv], out);
    }
}

impl ConstellationSegment {
    /// Decode one record. `bytes` must hold at least `RECORD_SIZE` bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let [ra1, dec1, ra2, dec2] = read_f32s(&bytes[..RECORD_SIZE]);
        Self {
            ra1,
            dec1,
            ra2,
            dec2,
        }
    }

    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        write_f32s([self.ra1, self.dec1, self.ra2, self.dec2], out);
    }
}

/// `stars-meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarMeta {
    pub star_count: u32,
    pub min_magnitude: f32,
    pub max_magnitude: f32,
    #[serde(rename = "minBV")]
    pub min_bv: f32,
    #[serde(rename = "maxBV")]
    pub max_bv: f32,
}

impl StarMeta {
    /// Expected byte length of `stars.bin`
    pub fn total_bytes(&self) -> u64 {
        self.star_count as u64 * RECORD_SIZE as u64
    }
}

/// `constellations-meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationMeta {
    pub line_count: u32,
    pub constellation_count: u32,
}

/// Path of an asset inside the data directory, preferring the plain file and
/// falling back to a gzipped `<name>.gz` sibling.
pub fn resolve_asset(data_dir: &Path, name: &str) -> PathBuf {
    let plain = data_dir.join(name);
    if plain.exists() {
        return plain;
    }
    let gz = data_dir.join(format!("{name}.gz"));
    if gz.exists() {
        gz
    } else {
        plain
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Open an asset for streaming, decoding gzip transparently.
pub fn open_asset(path: &Path) -> RenderResult<Box<dyn Read + Send>> {
    let file = File::open(path).map_err(|e| RenderError::data_fetch(display_name(path), e))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// On-disk length of an uncompressed asset; `None` for gzip files.
pub fn asset_len(path: &Path) -> Option<u64> {
    if is_gzip(path) {
        return None;
    }
    std::fs::metadata(path).ok().map(|m| m.len())
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> RenderResult<T> {
    let name = display_name(path);
    let reader = open_asset(path)?;
    serde_json::from_reader(reader).map_err(|e| RenderError::catalog(name, e))
}

/// Read `stars-meta.json` and compare it against the size of `stars.bin`.
pub fn load_star_meta(data_dir: &Path) -> RenderResult<StarMeta> {
    let path = resolve_asset(data_dir, STARS_META);
    log::info!("Loading star metadata from {:?}", path);
    let meta: StarMeta = read_json(&path)?;

    let bin = resolve_asset(data_dir, STARS_BIN);
    if let Some(len) = asset_len(&bin) {
        if len != meta.total_bytes() {
            log::warn!(
                "{} is {} bytes but metadata declares {} stars ({} bytes)",
                display_name(&bin),
                len,
                meta.star_count,
                meta.total_bytes()
            );
        }
    }

    log::info!(
        "Star catalog: {} stars, magnitude {:.2}..{:.2}, B-V {:.2}..{:.2}",
        meta.star_count,
        meta.min_magnitude,
        meta.max_magnitude,
        meta.min_bv,
        meta.max_bv
    );
    Ok(meta)
}

/// Decode a whole constellation binary, validating alignment.
pub fn decode_segments(bytes: &[u8], asset: &str) -> RenderResult<Vec<ConstellationSegment>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(RenderError::catalog(
            asset,
            format!(
                "length {} is not a multiple of {} bytes",
                bytes.len(),
                RECORD_SIZE
            ),
        ));
    }
    Ok(bytes
        .chunks_exact(RECORD_SIZE)
        .map(ConstellationSegment::from_le_bytes)
        .collect())
}

/// Load all constellation segments. The binary decides what is drawn; a
/// disagreeing or missing metadata file only produces a warning.
pub fn load_constellations(data_dir: &Path) -> RenderResult<Vec<ConstellationSegment>> {
    let bin = resolve_asset(data_dir, CONSTELLATIONS_BIN);
    let name = display_name(&bin);
    log::info!("Loading constellation lines from {:?}", bin);

    let mut bytes = Vec::new();
    open_asset(&bin)?
        .read_to_end(&mut bytes)
        .map_err(|e| RenderError::data_fetch(name.clone(), e))?;
    let segments = decode_segments(&bytes, &name)?;

    match read_json::<ConstellationMeta>(&resolve_asset(data_dir, CONSTELLATIONS_META)) {
        Ok(meta) if meta.line_count as usize != segments.len() => log::warn!(
            "{} holds {} segments but metadata declares {}",
            name,
            segments.len(),
            meta.line_count
        ),
        Ok(meta) => log::info!(
            "Loaded {} constellation segments across {} constellations",
            segments.len(),
            meta.constellation_count
        ),
        Err(e) => log::warn!("Constellation metadata unavailable: {}", e),
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(std::mem::size_of::<StarRecord>(), RECORD_SIZE);
        assert_eq!(std::mem::size_of::<ConstellationSegment>(), RECORD_SIZE);

        let star = StarRecord {
            ra: 1.5,
            dec: -0.25,
            magnitude: 3.0,
            bv: 0.65,
        };
        let mut bytes = Vec::new();
        star.write_le_bytes(&mut bytes);
        assert_eq!(&bytes[..4], &1.5f32.to_le_bytes());
        assert_eq!(bytemuck::bytes_of(&star).len(), RECORD_SIZE);
        assert_eq!(StarRecord::from_le_bytes(&bytes), star);
    }

    #[test]
    fn test_meta_json_field_names() {
        let json = r#"{"starCount":2,"minMagnitude":-1.46,"maxMagnitude":6.5,"minBV":-0.3,"maxBV":2.1}"#;
        let meta: StarMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.star_count, 2);
        assert_eq!(meta.total_bytes(), 32);

        let out = serde_json::to_string(&meta).unwrap();
        assert!(out.contains("\"minBV\""));

        let json = r#"{"lineCount":3,"constellationCount":1}"#;
        let meta: ConstellationMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.line_count, 3);
    }

    #[test]
    fn test_misaligned_segments_are_rejected() {
        let err = decode_segments(&[0u8; 20], "constellations.bin").unwrap_err();
        assert!(matches!(err, RenderError::Catalog { .. }));
        assert_eq!(decode_segments(&[], "x").unwrap().len(), 0);
    }

    #[test]
    fn test_load_constellations_plain_and_gzip() {
        let segment = ConstellationSegment {
            ra1: 0.1,
            dec1: 0.2,
            ra2: 0.3,
            dec2: 0.4,
        };
        let mut bytes = Vec::new();
        segment.write_le_bytes(&mut bytes);
        segment.write_le_bytes(&mut bytes);

        let plain = tempfile::tempdir().unwrap();
        write_file(plain.path(), CONSTELLATIONS_BIN, &bytes);
        write_file(
            plain.path(),
            CONSTELLATIONS_META,
            br#"{"lineCount":2,"constellationCount":1}"#,
        );
        let loaded = load_constellations(plain.path()).unwrap();
        assert_eq!(loaded, vec![segment, segment]);

        let gz = tempfile::tempdir().unwrap();
        let file = File::create(gz.path().join("constellations.bin.gz")).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&bytes).unwrap();
        encoder.finish().unwrap();
        // Missing metadata is only a warning
        let loaded = load_constellations(gz.path()).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_missing_star_meta_is_data_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_star_meta(dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::DataFetch { ref asset, .. } if asset == STARS_META));
    }

    #[test]
    fn test_malformed_star_meta_is_catalog_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), STARS_META, b"{\"starCount\": \"many\"}");
        let err = load_star_meta(dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::Catalog { .. }));
    }
}
