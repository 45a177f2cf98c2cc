//! File format detection from leading bytes.
//!
//! Extensions in weather archives are unreliable (`.pp`, `.pp0`, `.nc`,
//! none at all), so detection looks at magic numbers only.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{LoadError, Result};

const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// Fortran record length of a PP header: 64 words of 4 bytes.
const PP_HEADER_MARKER: i32 = 256;

/// First word of a UM FieldsFile fixed-length header (data set format version).
const FIELDSFILE_VERSION: i64 = 20;

/// Detected file type based on content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Classic, 64-bit offset or CDF5 NetCDF
    NetCdf3,
    /// NetCDF-4 (HDF5 container)
    NetCdf4,
    /// GRIB with its edition number
    Grib { edition: u8 },
    /// UM post-processing file
    Pp,
    /// UM FieldsFile
    FieldsFile,
}

impl FileType {
    pub fn name(&self) -> &'static str {
        match self {
            FileType::NetCdf3 => "NetCDF-3",
            FileType::NetCdf4 => "NetCDF-4",
            FileType::Grib { edition: 1 } => "GRIB1",
            FileType::Grib { .. } => "GRIB2",
            FileType::Pp => "PP",
            FileType::FieldsFile => "FieldsFile",
        }
    }
}

/// Detect the format of the file at `path`.
pub fn detect_file_type(path: &Path) -> Result<FileType> {
    let mut file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut head = [0u8; 8];
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..]).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    detect_from_bytes(&head[..filled]).ok_or_else(|| LoadError::UnknownFormat(path.to_path_buf()))
}

/// Detect a format from the first (up to) eight bytes of a file.
pub fn detect_from_bytes(head: &[u8]) -> Option<FileType> {
    if head.len() >= 4 && &head[..3] == b"CDF" && matches!(head[3], 1 | 2 | 5) {
        return Some(FileType::NetCdf3);
    }
    if head.len() >= 8 && &head[..8] == HDF5_SIGNATURE {
        return Some(FileType::NetCdf4);
    }
    if head.len() >= 8 && &head[..4] == b"GRIB" && matches!(head[7], 1 | 2) {
        return Some(FileType::Grib { edition: head[7] });
    }
    if head.len() >= 8 && i64::from_be_bytes(head[..8].try_into().ok()?) == FIELDSFILE_VERSION {
        return Some(FileType::FieldsFile);
    }
    if head.len() >= 4 && i32::from_be_bytes(head[..4].try_into().ok()?) == PP_HEADER_MARKER {
        return Some(FileType::Pp);
    }
    None
}
