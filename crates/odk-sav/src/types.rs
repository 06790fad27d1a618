//! Variable, format and value types.

use chrono::{NaiveDate, NaiveDateTime};

/// Longest string a short-string variable can hold.
pub const MAX_STRING_WIDTH: u16 = 255;

/// Longest variable name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// System-missing numeric value.
pub const SYSMIS: f64 = -f64::MAX;

/// Print/write format types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Character.
    A,
    /// Plain numeric.
    F,
    /// `dd-mmm-yyyy`.
    Date,
    /// `dd-mmm-yyyy hh:mm:ss`.
    DateTime,
    /// `dd.mm.yyyy`.
    EDate,
}

impl FormatType {
    pub const fn code(self) -> u32 {
        match self {
            Self::A => 1,
            Self::F => 5,
            Self::Date => 20,
            Self::DateTime => 22,
            Self::EDate => 38,
        }
    }
}

/// A print/write format such as `F8.2` or `A255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavFormat {
    pub format_type: FormatType,
    pub width: u8,
    pub decimals: u8,
}

impl SavFormat {
    pub const fn new(format_type: FormatType, width: u8, decimals: u8) -> Self {
        Self {
            format_type,
            width,
            decimals,
        }
    }

    /// Packed `type << 16 | width << 8 | decimals` form.
    pub const fn packed(self) -> u32 {
        (self.format_type.code() << 16) | ((self.width as u32) << 8) | self.decimals as u32
    }
}

/// Storage type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Numeric,
    /// String of the given byte width (1..=255).
    String(u16),
}

impl VarType {
    /// Number of 8-byte case segments the variable occupies.
    pub fn segments(self) -> usize {
        match self {
            VarType::Numeric => 1,
            VarType::String(width) => usize::from(width).div_ceil(8).max(1),
        }
    }

    /// Value written in the type field of the variable record.
    pub fn type_code(self) -> i32 {
        match self {
            VarType::Numeric => 0,
            VarType::String(width) => i32::from(width),
        }
    }
}

/// One cell of a case.
#[derive(Debug, Clone, PartialEq)]
pub enum SavValue {
    /// `None` is system-missing.
    Numeric(Option<f64>),
    String(String),
}

impl SavValue {
    pub fn numeric(value: f64) -> Self {
        Self::Numeric(Some(value))
    }

    pub fn missing() -> Self {
        Self::Numeric(None)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// A date as seconds since the Gregorian epoch.
    pub fn date(date: NaiveDate) -> Self {
        Self::numeric(seconds_since_epoch(date.and_time(chrono::NaiveTime::MIN)))
    }

    pub fn datetime(value: NaiveDateTime) -> Self {
        Self::numeric(seconds_since_epoch(value))
    }
}

/// Seconds between 1582-10-14 00:00:00 and `value`, the time base of date
/// variables.
pub fn seconds_since_epoch(value: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1582, 10, 14)
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN);
    (value - epoch).num_seconds() as f64
}

/// A labelled value of a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueLabel {
    pub value: SavValue,
    pub label: String,
}

/// A variable of the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct SavVariable {
    /// Long name, up to 64 bytes.
    pub name: String,
    pub label: Option<String>,
    pub var_type: VarType,
    pub format: SavFormat,
    pub value_labels: Vec<ValueLabel>,
}

impl SavVariable {
    /// Numeric variable printed as `F8.2`.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            var_type: VarType::Numeric,
            format: SavFormat::new(FormatType::F, 8, 2),
            value_labels: Vec::new(),
        }
    }

    /// String variable of `width` bytes.
    pub fn string(name: impl Into<String>, width: u16) -> Self {
        Self {
            name: name.into(),
            label: None,
            var_type: VarType::String(width),
            format: SavFormat::new(FormatType::A, u8::try_from(width).unwrap_or(u8::MAX), 0),
            value_labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_format(mut self, format: SavFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_value_label(mut self, value: SavValue, label: impl Into<String>) -> Self {
        self.value_labels.push(ValueLabel {
            value,
            label: label.into(),
        });
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.var_type == VarType::Numeric
    }
}

/// Options for the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavWriterOptions {
    pub file_label: Option<String>,
    pub created: NaiveDateTime,
}

impl Default for SavWriterOptions {
    fn default() -> Self {
        Self {
            file_label: None,
            created: chrono::Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_packing() {
        assert_eq!(SavFormat::new(FormatType::F, 8, 2).packed(), 0x0005_0802);
        assert_eq!(SavFormat::new(FormatType::A, 255, 0).packed(), 0x0001_ff00);
    }

    #[test]
    fn string_segments_round_up() {
        assert_eq!(VarType::String(1).segments(), 1);
        assert_eq!(VarType::String(8).segments(), 1);
        assert_eq!(VarType::String(9).segments(), 2);
        assert_eq!(VarType::String(255).segments(), 32);
    }

    #[test]
    fn dates_count_seconds_from_gregorian_epoch() {
        let date = NaiveDate::from_ymd_opt(1582, 10, 15).expect("date");
        assert_eq!(SavValue::date(date), SavValue::numeric(86_400.0));
    }
}
