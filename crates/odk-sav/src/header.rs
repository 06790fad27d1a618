//! Dictionary record building.
//!
//! All integers are little-endian. The file starts with a 176-byte header:
//!
//! | Offset | Field              | Type      |
//! |--------|--------------------|-----------|
//! | 0      | rec_type `$FL2`    | char[4]   |
//! | 4      | product name       | char[60]  |
//! | 64     | layout code (2)    | i32       |
//! | 68     | nominal case size  | i32       |
//! | 72     | compression (0)    | i32       |
//! | 76     | weight index (0)   | i32       |
//! | 80     | number of cases    | i32       |
//! | 84     | bias (100.0)       | f64       |
//! | 92     | creation date      | char[9]   |
//! | 101    | creation time      | char[8]   |
//! | 109    | file label         | char[64]  |
//! | 173    | padding            | char[3]   |

use chrono::NaiveDateTime;

use crate::types::{SYSMIS, SavValue, SavVariable, SavWriterOptions, VarType};

pub const HEADER_LEN: usize = 176;
pub const MAGIC: &[u8; 4] = b"$FL2";
/// Offset of the case count patched in when the file is finished.
pub const NCASES_OFFSET: u64 = 80;

const PRODUCT: &str = "@(#) SPSS DATA FILE odk-export";

const REC_VARIABLE: i32 = 2;
const REC_VALUE_LABELS: i32 = 3;
const REC_VALUE_LABEL_VARS: i32 = 4;
const REC_EXTENSION: i32 = 7;
const REC_DICT_END: i32 = 999;

const SUBTYPE_INTEGER_INFO: i32 = 3;
const SUBTYPE_FLOAT_INFO: i32 = 4;
const SUBTYPE_LONG_NAMES: i32 = 13;
const SUBTYPE_ENCODING: i32 = 20;
const SUBTYPE_LONG_STRING_LABELS: i32 = 21;

/// UTF-8 code page.
const CODE_PAGE_UTF8: i32 = 65001;

/// Space padded (or truncated) to exactly `len` bytes, never splitting a character.
pub fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut end = text.len().min(len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = text.as_bytes()[..end].to_vec();
    out.resize(len, b' ');
    out
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// The file header, with the case count set to -1 (unknown).
pub fn build_file_header(
    options: &SavWriterOptions,
    nominal_case_size: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(MAGIC);
    out.extend(padded(PRODUCT, 60));
    put_i32(&mut out, 2);
    put_i32(&mut out, len_i32(nominal_case_size));
    put_i32(&mut out, 0);
    put_i32(&mut out, 0);
    put_i32(&mut out, -1);
    put_f64(&mut out, 100.0);
    out.extend(creation_stamp(options.created));
    out.extend(padded(options.file_label.as_deref().unwrap_or(""), 64));
    out.extend_from_slice(&[0; 3]);
    out
}

fn creation_stamp(created: NaiveDateTime) -> Vec<u8> {
    let mut out = padded(&created.format("%d %b %y").to_string(), 9);
    out.extend(padded(&created.format("%H:%M:%S").to_string(), 8));
    out
}

/// Variable record plus the continuation records of a long string.
pub fn build_variable_records(variable: &SavVariable, short_name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    put_i32(&mut out, REC_VARIABLE);
    put_i32(&mut out, variable.var_type.type_code());
    let label = variable.label.as_deref().filter(|label| !label.is_empty());
    put_i32(&mut out, i32::from(label.is_some()));
    put_i32(&mut out, 0);
    let format = variable.format.packed() as i32;
    put_i32(&mut out, format);
    put_i32(&mut out, format);
    out.extend(padded(short_name, 8));
    if let Some(label) = label {
        let bytes = padded(label, label.len().min(255));
        put_i32(&mut out, len_i32(bytes.len()));
        let padded_len = bytes.len().div_ceil(4) * 4;
        out.extend(&bytes);
        out.resize(out.len() + (padded_len - bytes.len()), b' ');
    }

    for _ in 1..variable.var_type.segments() {
        put_i32(&mut out, REC_VARIABLE);
        put_i32(&mut out, -1);
        put_i32(&mut out, 0);
        put_i32(&mut out, 0);
        put_i32(&mut out, 0);
        put_i32(&mut out, 0);
        out.extend_from_slice(&[b' '; 8]);
    }
    out
}

/// Value labels of a numeric or short-string variable (records 3 and 4).
///
/// `dictionary_index` is the 1-based position of the variable's first segment.
pub fn build_value_labels(variable: &SavVariable, dictionary_index: usize) -> Vec<u8> {
    let mut out = Vec::new();
    if variable.value_labels.is_empty() {
        return out;
    }
    put_i32(&mut out, REC_VALUE_LABELS);
    put_i32(&mut out, len_i32(variable.value_labels.len()));
    for entry in &variable.value_labels {
        match &entry.value {
            SavValue::Numeric(value) => put_f64(&mut out, value.unwrap_or(SYSMIS)),
            SavValue::String(text) => out.extend(padded(text, 8)),
        }
        let label = padded(&entry.label, entry.label.len().min(120));
        out.push(u8::try_from(label.len()).unwrap_or(u8::MAX));
        let total = (1 + label.len()).div_ceil(8) * 8;
        out.extend(&label);
        out.resize(out.len() + (total - 1 - label.len()), b' ');
    }
    put_i32(&mut out, REC_VALUE_LABEL_VARS);
    put_i32(&mut out, 1);
    put_i32(&mut out, len_i32(dictionary_index));
    out
}

fn extension(subtype: i32, size: usize, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + payload.len());
    put_i32(&mut out, REC_EXTENSION);
    put_i32(&mut out, subtype);
    put_i32(&mut out, len_i32(size));
    put_i32(&mut out, len_i32(payload.len() / size));
    out.extend_from_slice(payload);
    out
}

/// Machine integer info: version, IEEE floats, little-endian, UTF-8.
pub fn build_integer_info() -> Vec<u8> {
    let mut payload = Vec::with_capacity(32);
    for value in [1, 0, 0, -1, 1, 1, 2, CODE_PAGE_UTF8] {
        put_i32(&mut payload, value);
    }
    extension(SUBTYPE_INTEGER_INFO, 4, &payload)
}

/// Machine float info: system-missing, highest and lowest values.
pub fn build_float_info() -> Vec<u8> {
    let mut payload = Vec::with_capacity(24);
    put_f64(&mut payload, SYSMIS);
    put_f64(&mut payload, f64::MAX);
    put_f64(&mut payload, f64::from_bits(0xffef_ffff_ffff_fffe));
    extension(SUBTYPE_FLOAT_INFO, 8, &payload)
}

/// `SHORT=LongName` pairs separated by tabs.
pub fn build_long_names(pairs: &[(String, String)]) -> Vec<u8> {
    let text = pairs
        .iter()
        .map(|(short, long)| format!("{short}={long}"))
        .collect::<Vec<_>>()
        .join("\t");
    extension(SUBTYPE_LONG_NAMES, 1, text.as_bytes())
}

pub fn build_encoding() -> Vec<u8> {
    extension(SUBTYPE_ENCODING, 1, b"UTF-8")
}

/// Value labels of string variables wider than 8 bytes.
pub fn build_long_string_labels(variables: &[SavVariable]) -> Vec<u8> {
    let mut payload = Vec::new();
    for variable in variables {
        let VarType::String(width) = variable.var_type else {
            continue;
        };
        if width <= 8 || variable.value_labels.is_empty() {
            continue;
        }
        put_i32(&mut payload, len_i32(variable.name.len()));
        payload.extend_from_slice(variable.name.as_bytes());
        put_i32(&mut payload, i32::from(width));
        put_i32(&mut payload, len_i32(variable.value_labels.len()));
        for entry in &variable.value_labels {
            let value = match &entry.value {
                SavValue::String(text) => padded(text, usize::from(width)),
                SavValue::Numeric(value) => {
                    padded(&value.map(|v| v.to_string()).unwrap_or_default(), usize::from(width))
                }
            };
            put_i32(&mut payload, len_i32(value.len()));
            payload.extend(value);
            put_i32(&mut payload, len_i32(entry.label.len()));
            payload.extend_from_slice(entry.label.as_bytes());
        }
    }
    if payload.is_empty() {
        return payload;
    }
    extension(SUBTYPE_LONG_STRING_LABELS, 1, &payload)
}

pub fn build_dictionary_end() -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    put_i32(&mut out, REC_DICT_END);
    put_i32(&mut out, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SavVariable;

    #[test]
    fn header_is_176_bytes() {
        let header = build_file_header(&SavWriterOptions::default(), 3);
        assert_eq!(header.len(), HEADER_LEN);
        assert_eq!(&header[..4], MAGIC);
        assert_eq!(&header[80..84], &(-1i32).to_le_bytes());
    }

    #[test]
    fn long_strings_get_continuation_records() {
        let variable = SavVariable::string("comment", 20);
        let records = build_variable_records(&variable, "COMMENT");
        assert_eq!(records.len(), 32 * 3);
        assert_eq!(&records[36..40], &(-1i32).to_le_bytes());
    }

    #[test]
    fn labels_are_padded_to_four_bytes() {
        let variable = SavVariable::numeric("age").with_label("Age");
        let records = build_variable_records(&variable, "AGE");
        assert_eq!(records.len(), 32 + 4 + 4);
    }

    #[test]
    fn value_label_entries_are_eight_byte_aligned() {
        let variable = SavVariable::numeric("sex").with_value_label(SavValue::numeric(1.0), "Male");
        let records = build_value_labels(&variable, 4);
        // rec 3 header, value, label block, rec 4 with one index
        assert_eq!(records.len(), 8 + 8 + 8 + 12);
        assert_eq!(&records[records.len() - 4..], &4i32.to_le_bytes());
    }

    #[test]
    fn padding_never_splits_characters() {
        assert_eq!(padded("héllo", 2), b"h ".to_vec());
    }
}
