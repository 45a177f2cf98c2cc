//! UM post-processing (PP) file decoding.
//!
//! A PP file is a sequence of big-endian Fortran unformatted records, two per
//! field: a 64-word lookup header (45 integers then 19 reals) and the data.
//! Only unpacked fields on regular latitude/longitude grids are decoded.

use std::path::Path;

use chrono::{NaiveDate, SecondsFormat};
use cube::{Coord, CubeList, GridCube};
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::error::{LoadError, Result};

const INT_WORDS: usize = 45;
const REAL_WORDS: usize = 19;
const HEADER_BYTES: usize = (INT_WORDS + REAL_WORDS) * 4;

// Integer header word positions
const LBYR: usize = 0;
const LBFT: usize = 13;
const LBLREC: usize = 14;
const LBROW: usize = 17;
const LBNPT: usize = 18;
const LBPACK: usize = 20;
const LBLEV: usize = 32;
const LBUSER4: usize = 41;

// Real header word positions
const BZY: usize = 13;
const BDY: usize = 14;
const BZX: usize = 15;
const BDX: usize = 16;
const BMDI: usize = 17;

/// The lookup header of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct PpHeader {
    pub ints: [i32; INT_WORDS],
    pub reals: [f32; REAL_WORDS],
}

impl PpHeader {
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != HEADER_BYTES {
            return None;
        }
        let mut words = bytes.chunks_exact(4).map(|w| [w[0], w[1], w[2], w[3]]);
        let mut ints = [0i32; INT_WORDS];
        for slot in ints.iter_mut() {
            *slot = i32::from_be_bytes(words.next()?);
        }
        let mut reals = [0f32; REAL_WORDS];
        for slot in reals.iter_mut() {
            *slot = f32::from_be_bytes(words.next()?);
        }
        Some(Self { ints, reals })
    }

    pub fn rows(&self) -> usize {
        self.ints[LBROW].max(0) as usize
    }

    pub fn columns(&self) -> usize {
        self.ints[LBNPT].max(0) as usize
    }

    /// STASH code written as `m01s<section>i<item>`.
    pub fn stash_name(&self) -> String {
        let stash = self.ints[LBUSER4];
        format!("m01s{:02}i{:03}", stash / 1000, stash % 1000)
    }

    /// Validity time in ISO-8601, if the date words form a real date.
    pub fn validity_time(&self) -> Option<String> {
        let [yr, mon, day, hr, min] = [0, 1, 2, 3, 4].map(|i| self.ints[LBYR + i]);
        let time = NaiveDate::from_ymd_opt(yr, mon.try_into().ok()?, day.try_into().ok()?)?
            .and_hms_opt(hr.try_into().ok()?, min.try_into().ok()?, 0)?;
        Some(time.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn latitudes(&self) -> Vec<f64> {
        regular_points(self.reals[BZY], self.reals[BDY], self.rows())
    }

    fn longitudes(&self) -> Vec<f64> {
        regular_points(self.reals[BZX], self.reals[BDX], self.columns())
    }
}

/// Points of a regular axis whose zeroth point (one step before the first) is `zero`.
fn regular_points(zero: f32, step: f32, count: usize) -> Vec<f64> {
    (1..=count)
        .map(|k| ((zero as f64 + k as f64 * step as f64) * 1e6).round() / 1e6)
        .collect()
}

/// Decode every field of a PP file.
pub fn load_cubes(path: &Path) -> Result<CubeList> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pp_err = |message: String| LoadError::Pp {
        path: path.to_path_buf(),
        message,
    };

    let mut records = RecordReader::new(&bytes);
    let mut cubes = CubeList::default();
    while let Some(header_bytes) = records.next_record().map_err(pp_err)? {
        let header = PpHeader::from_bytes(header_bytes).ok_or_else(|| {
            pp_err(format!(
                "field {} header is {} bytes, expected {}",
                cubes.len(),
                header_bytes.len(),
                HEADER_BYTES
            ))
        })?;
        let data = records
            .next_record()
            .map_err(pp_err)?
            .ok_or_else(|| pp_err(format!("field {} has no data record", cubes.len())))?;

        let cube = decode_field(path, &header, data)?;
        debug!(
            path = %path.display(),
            name = cube.name(),
            shape = ?cube.shape(),
            "Decoded PP field"
        );
        cubes.push(cube);
    }

    if cubes.is_empty() {
        return Err(pp_err("file contains no fields".to_string()));
    }
    Ok(cubes)
}

fn decode_field(path: &Path, header: &PpHeader, data: &[u8]) -> Result<GridCube> {
    let pp_err = |message: String| LoadError::Pp {
        path: path.to_path_buf(),
        message,
    };

    let lbpack = header.ints[LBPACK];
    if lbpack % 10 != 0 {
        return Err(LoadError::Unsupported {
            path: path.to_path_buf(),
            reason: format!("packed PP field (LBPACK {})", lbpack),
        });
    }
    if header.reals[BDX] == 0.0 || header.reals[BDY] == 0.0 {
        return Err(LoadError::Unsupported {
            path: path.to_path_buf(),
            reason: "irregular PP grid".to_string(),
        });
    }

    let (rows, cols) = (header.rows(), header.columns());
    let count = rows * cols;
    if data.len() != count * 4 {
        return Err(pp_err(format!(
            "data record holds {} bytes for a {}x{} grid (LBLREC {})",
            data.len(),
            rows,
            cols,
            header.ints[LBLREC]
        )));
    }

    let mdi = header.reals[BMDI];
    let mut mask = Vec::with_capacity(count);
    let values: Vec<f32> = data
        .chunks_exact(4)
        .map(|w| {
            let v = f32::from_be_bytes([w[0], w[1], w[2], w[3]]);
            let missing = v == mdi || v.is_nan();
            mask.push(missing);
            if missing {
                f32::NAN
            } else {
                v
            }
        })
        .collect();

    let mut cube = GridCube::from_lat_lon(header.stash_name(), header.latitudes(), header.longitudes(), values)?;
    if mask.iter().any(|&m| m) {
        let mask = ArrayD::from_shape_vec(IxDyn(&[rows, cols]), mask).map_err(|e| pp_err(e.to_string()))?;
        cube.set_mask(Some(mask))?;
    }

    cube.set_attribute("STASH", header.stash_name());
    if let Some(time) = header.validity_time() {
        cube.set_attribute("time", time);
    }
    cube.add_aux_coord(
        Coord::scalar("forecast_period", header.ints[LBFT] as f64).with_units("hours"),
        None,
    )?;
    cube.add_aux_coord(Coord::scalar("model_level_number", header.ints[LBLEV] as f64), None)?;
    Ok(cube)
}

/// Iterates over big-endian Fortran sequential records.
struct RecordReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// The next record payload; `None` at a clean end of file.
    fn next_record(&mut self) -> std::result::Result<Option<&'a [u8]>, String> {
        if self.offset == self.bytes.len() {
            return Ok(None);
        }
        let start = self.offset;
        let len = self.read_marker()?;
        let payload = self
            .bytes
            .get(self.offset..self.offset + len)
            .ok_or_else(|| format!("record at byte {} truncated", start))?;
        self.offset += len;
        let trailer = self.read_marker()?;
        if trailer != len {
            return Err(format!(
                "record at byte {} has markers {} and {}",
                start, len, trailer
            ));
        }
        Ok(Some(payload))
    }

    fn read_marker(&mut self) -> std::result::Result<usize, String> {
        let word = self
            .bytes
            .get(self.offset..self.offset + 4)
            .ok_or_else(|| format!("record marker at byte {} truncated", self.offset))?;
        self.offset += 4;
        let len = i32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        usize::try_from(len).map_err(|_| format!("negative record length {}", len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PpHeader {
        let mut ints = [0i32; INT_WORDS];
        ints[..5].copy_from_slice(&[2024, 1, 15, 12, 30]);
        ints[LBROW] = 2;
        ints[LBNPT] = 3;
        ints[LBUSER4] = 4203;
        let mut reals = [0f32; REAL_WORDS];
        reals[BZY] = 49.5;
        reals[BDY] = 0.5;
        reals[BZX] = -1.0;
        reals[BDX] = 0.25;
        PpHeader { ints, reals }
    }

    #[test]
    fn test_stash_name() {
        assert_eq!(header().stash_name(), "m01s04i203");
        let mut h = header();
        h.ints[LBUSER4] = 24;
        assert_eq!(h.stash_name(), "m01s00i024");
    }

    #[test]
    fn test_axes_start_one_step_after_zeroth_point() {
        let h = header();
        assert_eq!(h.latitudes(), vec![50.0, 50.5]);
        assert_eq!(h.longitudes(), vec![-0.75, -0.5, -0.25]);
    }

    #[test]
    fn test_validity_time() {
        assert_eq!(header().validity_time().as_deref(), Some("2024-01-15T12:30:00Z"));
        let mut h = header();
        h.ints[1] = 13;
        assert_eq!(h.validity_time(), None);
    }

    #[test]
    fn test_record_reader() {
        let mut bytes = Vec::new();
        for payload in [&b"abcd"[..], &b"xy"[..]] {
            bytes.extend_from_slice(&(payload.len() as i32).to_be_bytes());
            bytes.extend_from_slice(payload);
            bytes.extend_from_slice(&(payload.len() as i32).to_be_bytes());
        }
        let mut reader = RecordReader::new(&bytes);
        assert_eq!(reader.next_record().unwrap(), Some(&b"abcd"[..]));
        assert_eq!(reader.next_record().unwrap(), Some(&b"xy"[..]));
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn test_record_reader_mismatched_markers() {
        let mut bytes = 2i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"xy");
        bytes.extend_from_slice(&3i32.to_be_bytes());
        assert!(RecordReader::new(&bytes).next_record().is_err());
    }
}
