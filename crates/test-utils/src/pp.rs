//! Writer for minimal UM PP files.
//!
//! Produces big-endian Fortran sequential records: a 256-byte header record
//! (45 integer words then 19 real words) followed by the data record, for
//! every field.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One PP field on a regular latitude/longitude grid.
#[derive(Debug, Clone)]
pub struct PpFieldSpec {
    /// STASH code as `section * 1000 + item`.
    pub stash: i32,
    pub model_level: i32,
    /// Forecast period in hours.
    pub forecast_period: i32,
    /// Validity time: year, month, day, hour, minute.
    pub time: (i32, i32, i32, i32, i32),
    pub first_lat: f32,
    pub lat_step: f32,
    pub first_lon: f32,
    pub lon_step: f32,
    pub rows: usize,
    pub cols: usize,
    /// Row-major values, `rows * cols` of them.
    pub data: Vec<f32>,
    pub missing_value: f32,
    pub lbpack: i32,
}

impl PpFieldSpec {
    /// A field with the given shape and values and sensible defaults elsewhere.
    pub fn new(stash: i32, rows: usize, cols: usize, data: Vec<f32>) -> Self {
        Self {
            stash,
            model_level: 1,
            forecast_period: 0,
            time: (2024, 1, 15, 12, 0),
            first_lat: 50.0,
            lat_step: 1.0,
            first_lon: -5.0,
            lon_step: 1.0,
            rows,
            cols,
            data,
            missing_value: -1.0e30,
            lbpack: 0,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.model_level = level;
        self
    }

    pub fn with_forecast_period(mut self, hours: i32) -> Self {
        self.forecast_period = hours;
        self
    }

    pub fn with_time(mut self, year: i32, month: i32, day: i32, hour: i32, minute: i32) -> Self {
        self.time = (year, month, day, hour, minute);
        self
    }

    pub fn with_grid(mut self, first_lat: f32, lat_step: f32, first_lon: f32, lon_step: f32) -> Self {
        self.first_lat = first_lat;
        self.lat_step = lat_step;
        self.first_lon = first_lon;
        self.lon_step = lon_step;
        self
    }

    fn header(&self) -> ([i32; 45], [f32; 19]) {
        let mut ints = [0i32; 45];
        let (yr, mon, day, hr, min) = self.time;
        ints[0] = yr;
        ints[1] = mon;
        ints[2] = day;
        ints[3] = hr;
        ints[4] = min;
        ints[13] = self.forecast_period; // LBFT
        ints[14] = (self.rows * self.cols) as i32; // LBLREC
        ints[15] = 1; // LBCODE: regular lat/lon
        ints[17] = self.rows as i32; // LBROW
        ints[18] = self.cols as i32; // LBNPT
        ints[20] = self.lbpack; // LBPACK
        ints[32] = self.model_level; // LBLEV
        ints[38] = 1; // LBUSER1: real data
        ints[41] = self.stash; // LBUSER4
        ints[44] = 1; // LBUSER7: atmosphere model

        let mut reals = [0f32; 19];
        // BZY/BDY/BZX/BDX hold the zeroth point, one step before the first
        reals[13] = self.first_lat - self.lat_step; // BZY
        reals[14] = self.lat_step; // BDY
        reals[15] = self.first_lon - self.lon_step; // BZX
        reals[16] = self.lon_step; // BDX
        reals[17] = self.missing_value; // BMDI
        reals[18] = 1.0; // BMKS
        (ints, reals)
    }
}

/// Write `fields` to `path` as a PP file.
pub fn write_pp_file(path: &Path, fields: &[PpFieldSpec]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for field in fields {
        let (ints, reals) = field.header();

        let mut header = Vec::with_capacity(256);
        for v in ints {
            header.extend_from_slice(&v.to_be_bytes());
        }
        for v in reals {
            header.extend_from_slice(&v.to_be_bytes());
        }
        write_record(&mut out, &header)?;

        let mut data = Vec::with_capacity(field.data.len() * 4);
        for v in &field.data {
            data.extend_from_slice(&v.to_be_bytes());
        }
        write_record(&mut out, &data)?;
    }
    out.flush()
}

fn write_record<W: Write>(out: &mut W, payload: &[u8]) -> io::Result<()> {
    let marker = (payload.len() as i32).to_be_bytes();
    out.write_all(&marker)?;
    out.write_all(payload)?;
    out.write_all(&marker)
}
