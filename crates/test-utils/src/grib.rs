//! Synthetic GRIB2 messages.
//!
//! Builds single-field GRIB2 messages on a regular latitude/longitude grid
//! (templates 3.0, 4.0 and 5.0 with simple packing). NaN values are written
//! as missing through a bitmap.

use std::io;
use std::path::Path;

/// Build a minimal GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    /// Columns (i direction, west to east)
    ni: u32,
    /// Rows (j direction, north to south)
    nj: u32,
    /// North-west corner and increments in degrees
    first_lat: f64,
    first_lon: f64,
    lat_step: f64,
    lon_step: f64,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    data_values: Vec<f32>,
}

impl Grib2Builder {
    /// Surface temperature on a 1° grid whose north-west corner is 55°N 10°W.
    pub fn new(ni: u32, nj: u32) -> Self {
        Self {
            discipline: 0,
            center: 74, // UK Met Office
            year: 2024,
            month: 1,
            day: 15,
            hour: 12,
            ni,
            nj,
            first_lat: 55.0,
            first_lon: -10.0,
            lat_step: 1.0,
            lon_step: 1.0,
            param_category: 0,
            param_number: 0,
            level_type: 1,
            level_value: 0,
            forecast_hour: 0,
            data_values: vec![288.15; (ni * nj) as usize],
        }
    }

    pub fn with_origin(mut self, first_lat: f64, first_lon: f64, lat_step: f64, lon_step: f64) -> Self {
        self.first_lat = first_lat;
        self.first_lon = first_lon;
        self.lat_step = lat_step;
        self.lon_step = lon_step;
        self
    }

    pub fn with_parameter(mut self, discipline: u8, category: u8, number: u8) -> Self {
        self.discipline = discipline;
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    /// Row-major values from the north-west corner; NaN marks missing points.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), (self.ni * self.nj) as usize, "data must cover the grid");
        self.data_values = data;
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.section1(),
            self.section3(),
            self.section4(),
            self.section5(),
            self.section6(),
            self.section7(),
        ];
        let total = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(total);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(total as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    /// Write the message to `path`.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }

    fn present(&self) -> Vec<f32> {
        self.data_values.iter().copied().filter(|v| !v.is_nan()).collect()
    }

    fn has_missing(&self) -> bool {
        self.data_values.iter().any(|v| v.is_nan())
    }

    fn section1(&self) -> Vec<u8> {
        let mut s = section_header(21, 1);
        s.extend_from_slice(&self.center.to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes()); // sub-centre
        s.push(2); // master table version
        s.push(0); // local table version
        s.push(1); // reference time is start of forecast
        s.extend_from_slice(&self.year.to_be_bytes());
        s.extend_from_slice(&[self.month, self.day, self.hour, 0, 0]);
        s.push(0); // operational
        s.push(1); // forecast
        s
    }

    fn section3(&self) -> Vec<u8> {
        let mut s = section_header(72, 3);
        s.push(0); // grid defined by template
        s.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        s.push(0);
        s.push(0);
        s.extend_from_slice(&0u16.to_be_bytes()); // template 3.0

        s.push(6); // spherical earth, radius 6371229 m
        s.extend_from_slice(&[0; 15]);
        s.extend_from_slice(&self.ni.to_be_bytes());
        s.extend_from_slice(&self.nj.to_be_bytes());
        s.extend_from_slice(&0u32.to_be_bytes()); // basic angle
        s.extend_from_slice(&u32::MAX.to_be_bytes()); // subdivisions

        let last_lat = self.first_lat - self.lat_step * (self.nj - 1) as f64;
        let last_lon = self.first_lon + self.lon_step * (self.ni - 1) as f64;
        s.extend_from_slice(&sign_magnitude_32(micro(self.first_lat)));
        s.extend_from_slice(&(micro(self.first_lon.rem_euclid(360.0)) as u32).to_be_bytes());
        s.push(0x30); // increments given
        s.extend_from_slice(&sign_magnitude_32(micro(last_lat)));
        s.extend_from_slice(&(micro(last_lon.rem_euclid(360.0)) as u32).to_be_bytes());
        s.extend_from_slice(&(micro(self.lon_step) as u32).to_be_bytes());
        s.extend_from_slice(&(micro(self.lat_step) as u32).to_be_bytes());
        s.push(0); // +i, -j, rows consecutive
        s
    }

    fn section4(&self) -> Vec<u8> {
        let mut s = section_header(34, 4);
        s.extend_from_slice(&0u16.to_be_bytes()); // no coordinate values
        s.extend_from_slice(&0u16.to_be_bytes()); // template 4.0
        s.push(self.param_category);
        s.push(self.param_number);
        s.push(2); // forecast
        s.push(0);
        s.push(0);
        s.extend_from_slice(&0u16.to_be_bytes());
        s.push(0);
        s.push(1); // hours
        s.extend_from_slice(&self.forecast_hour.to_be_bytes());
        s.push(self.level_type);
        s.push(0);
        s.extend_from_slice(&self.level_value.to_be_bytes());
        s.push(255); // no second surface
        s.push(0);
        s.extend_from_slice(&0u32.to_be_bytes());
        s
    }

    /// Simple packing: value = R + X * 2^E, with 16-bit X and D = 0.
    fn packing(&self) -> (f32, i16, u8) {
        let present = self.present();
        let min = present.iter().copied().fold(f32::INFINITY, f32::min);
        let max = present.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let reference = if min.is_finite() { min } else { 0.0 };
        let range = max - min;
        if !(range > 0.0) {
            return (reference, 0, 0);
        }
        let exponent = (range as f64 / 65535.0).log2().ceil() as i16;
        (reference, exponent, 16)
    }

    fn section5(&self) -> Vec<u8> {
        let (reference, exponent, bits) = self.packing();
        let mut s = section_header(21, 5);
        s.extend_from_slice(&(self.present().len() as u32).to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes()); // template 5.0
        s.extend_from_slice(&reference.to_be_bytes());
        s.extend_from_slice(&sign_magnitude_16(exponent));
        s.extend_from_slice(&sign_magnitude_16(0));
        s.push(bits);
        s.push(0); // floating point
        s
    }

    fn section6(&self) -> Vec<u8> {
        if !self.has_missing() {
            let mut s = section_header(6, 6);
            s.push(255);
            return s;
        }
        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, v) in self.data_values.iter().enumerate() {
            if !v.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }
        let mut s = section_header(6 + bitmap.len() as u32, 6);
        s.push(0);
        s.extend_from_slice(&bitmap);
        s
    }

    fn section7(&self) -> Vec<u8> {
        let (reference, exponent, bits) = self.packing();
        let mut packed = Vec::new();
        if bits > 0 {
            let scale = 2f64.powi(exponent as i32);
            for v in self.present() {
                let x = ((v - reference) as f64 / scale).round().clamp(0.0, 65535.0) as u16;
                packed.extend_from_slice(&x.to_be_bytes());
            }
        }
        let mut s = section_header(5 + packed.len() as u32, 7);
        s.extend_from_slice(&packed);
        s
    }
}

/// Write several messages into one file.
pub fn write_grib2_file(path: &Path, messages: &[Grib2Builder]) -> io::Result<()> {
    let bytes: Vec<u8> = messages.iter().flat_map(Grib2Builder::build).collect();
    std::fs::write(path, bytes)
}

fn section_header(length: u32, number: u8) -> Vec<u8> {
    let mut s = Vec::with_capacity(length as usize);
    s.extend_from_slice(&length.to_be_bytes());
    s.push(number);
    s
}

fn micro(degrees: f64) -> i64 {
    (degrees * 1e6).round() as i64
}

/// GRIB encodes negative integers as sign bit plus magnitude.
fn sign_magnitude_32(value: i64) -> [u8; 4] {
    let magnitude = value.unsigned_abs() as u32 & 0x7FFF_FFFF;
    let bits = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    bits.to_be_bytes()
}

fn sign_magnitude_16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let bits = if value < 0 { magnitude | 0x8000 } else { magnitude };
    bits.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_framing() {
        let bytes = Grib2Builder::new(4, 3).build();
        assert_eq!(&bytes[0..4], b"GRIB");
        assert_eq!(bytes[7], 2);
        assert_eq!(u64::from_be_bytes(bytes[8..16].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(&bytes[bytes.len() - 4..], b"7777");
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(sign_magnitude_16(-3), [0x80, 0x03]);
        assert_eq!(sign_magnitude_32(-1), [0x80, 0, 0, 1]);
        assert_eq!(sign_magnitude_32(5), [0, 0, 0, 5]);
    }
}
