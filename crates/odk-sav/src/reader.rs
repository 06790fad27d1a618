//! File header reading, used to inspect written files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, SavError};
use crate::header::{HEADER_LEN, MAGIC};

/// Fields of the fixed 176-byte file header.
#[derive(Debug, Clone, PartialEq)]
pub struct SavHeader {
    pub product: String,
    pub nominal_case_size: usize,
    /// `None` when the writer was not finished.
    pub cases: Option<usize>,
    pub file_label: String,
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

/// Read and check the file header.
pub fn read_header(mut reader: impl Read) -> Result<SavHeader> {
    let mut bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut bytes).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            SavError::invalid_format("file is shorter than the header")
        } else {
            SavError::Io(err)
        }
    })?;
    if &bytes[..4] != MAGIC {
        return Err(SavError::invalid_format("missing $FL2 record type"));
    }
    if i32_at(&bytes, 64) != 2 {
        return Err(SavError::invalid_format("unsupported layout code"));
    }
    let nominal_case_size = usize::try_from(i32_at(&bytes, 68))
        .map_err(|_| SavError::invalid_format("negative nominal case size"))?;
    Ok(SavHeader {
        product: text(&bytes[4..64]),
        nominal_case_size,
        cases: usize::try_from(i32_at(&bytes, 80)).ok(),
        file_label: text(&bytes[109..173]),
    })
}

pub fn read_header_from_path(path: &Path) -> Result<SavHeader> {
    read_header(BufReader::new(File::open(path)?))
}
