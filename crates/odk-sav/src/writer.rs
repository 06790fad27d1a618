//! SAV file writer.
//!
//! The dictionary is written up front; cases are appended one at a time and
//! the case count in the header is patched when the writer is finished.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, SavError};
use crate::header::{
    NCASES_OFFSET, build_dictionary_end, build_encoding, build_file_header, build_float_info,
    build_integer_info, build_long_names, build_long_string_labels, build_value_labels,
    build_variable_records, padded,
};
use crate::names::short_names;
use crate::types::{MAX_NAME_LEN, MAX_STRING_WIDTH, SYSMIS, SavValue, SavVariable, SavWriterOptions, VarType};

/// Streaming SPSS system file writer.
pub struct SavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    variables: Vec<SavVariable>,
    cases: i32,
}

impl<W: Write + Seek> SavWriter<W> {
    /// Write the dictionary for `variables` and return a writer ready for cases.
    pub fn new(inner: W, variables: Vec<SavVariable>, options: &SavWriterOptions) -> Result<Self> {
        validate_variables(&variables)?;
        let mut writer = BufWriter::new(inner);

        let nominal_case_size: usize = variables.iter().map(|v| v.var_type.segments()).sum();
        writer.write_all(&build_file_header(options, nominal_case_size))?;

        let shorts = short_names(variables.iter().map(|v| v.name.as_str()));
        for (variable, short) in variables.iter().zip(&shorts) {
            writer.write_all(&build_variable_records(variable, short))?;
        }

        let mut dictionary_index = 1usize;
        for variable in &variables {
            let short_string = matches!(variable.var_type, VarType::String(width) if width <= 8);
            if variable.is_numeric() || short_string {
                writer.write_all(&build_value_labels(variable, dictionary_index))?;
            }
            dictionary_index += variable.var_type.segments();
        }

        writer.write_all(&build_integer_info())?;
        writer.write_all(&build_float_info())?;
        let pairs: Vec<(String, String)> = shorts
            .into_iter()
            .zip(variables.iter().map(|v| v.name.clone()))
            .collect();
        writer.write_all(&build_long_names(&pairs))?;
        writer.write_all(&build_encoding())?;
        writer.write_all(&build_long_string_labels(&variables))?;
        writer.write_all(&build_dictionary_end())?;

        Ok(Self {
            writer,
            variables,
            cases: 0,
        })
    }

    pub fn variables(&self) -> &[SavVariable] {
        &self.variables
    }

    pub fn cases(&self) -> usize {
        usize::try_from(self.cases).unwrap_or_default()
    }

    /// Append one case; `values` are in variable order.
    pub fn write_case(&mut self, values: &[SavValue]) -> Result<()> {
        if values.len() != self.variables.len() {
            return Err(SavError::CaseLengthMismatch {
                expected: self.variables.len(),
                actual: values.len(),
            });
        }
        for (value, variable) in values.iter().zip(&self.variables) {
            let expected = match (variable.var_type, value) {
                (VarType::Numeric, SavValue::String(_)) => "numeric",
                (VarType::String(_), SavValue::Numeric(_)) => "string",
                _ => continue,
            };
            return Err(SavError::TypeMismatch {
                name: variable.name.clone(),
                expected,
            });
        }
        for (value, variable) in values.iter().zip(&self.variables) {
            match (variable.var_type, value) {
                (VarType::String(width), SavValue::String(text)) => {
                    let mut bytes = padded(text, usize::from(width));
                    bytes.resize(variable.var_type.segments() * 8, b' ');
                    self.writer.write_all(&bytes)?;
                }
                (_, SavValue::Numeric(number)) => {
                    let number = number.filter(|n| n.is_finite()).unwrap_or(SYSMIS);
                    self.writer.write_all(&number.to_le_bytes())?;
                }
                (VarType::Numeric, SavValue::String(_)) => {}
            }
        }
        self.cases = self.cases.checked_add(1).ok_or(SavError::CaseCountOverflow)?;
        Ok(())
    }

    /// Patch the case count, flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        let mut inner = self
            .writer
            .into_inner()
            .map_err(|err| SavError::Io(err.into_error()))?;
        let end = inner.stream_position()?;
        inner.seek(SeekFrom::Start(NCASES_OFFSET))?;
        inner.write_all(&self.cases.to_le_bytes())?;
        inner.seek(SeekFrom::Start(end))?;
        inner.flush()?;
        Ok(inner)
    }
}

impl SavWriter<File> {
    /// Create a SAV file for writing.
    pub fn create(path: &Path, variables: Vec<SavVariable>, options: &SavWriterOptions) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, variables, options)
    }
}

/// Validate variables before writing the dictionary.
fn validate_variables(variables: &[SavVariable]) -> Result<()> {
    if variables.is_empty() {
        return Err(SavError::NoVariables);
    }
    let mut seen = HashSet::new();
    for variable in variables {
        let name = &variable.name;
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(SavError::InvalidVariableName { name: name.clone() });
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(SavError::DuplicateVariable { name: name.clone() });
        }
        if let VarType::String(width) = variable.var_type
            && (width == 0 || width > MAX_STRING_WIDTH)
        {
            return Err(SavError::InvalidWidth {
                name: name.clone(),
                width,
            });
        }
    }
    Ok(())
}
