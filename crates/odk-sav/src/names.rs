//! Variable name derivation.
//!
//! Column titles become variable names: `/` turns into `.`, `-` and `:` into
//! `_`, braces are dropped and the result is cut to 64 bytes. Names starting
//! with `_` are prefixed with `@`. A name that then clashes
//! case-insensitively with an earlier one gets `@` and four random hex
//! digits appended.

use uuid::Uuid;

use crate::types::MAX_NAME_LEN;

/// Room kept for the `@xxxx` suffix of a clashing name.
const SUFFIX_LEN: usize = 5;

fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn random_suffix() -> String {
    let id = Uuid::new_v4().to_string();
    let segment = id.split('-').nth(1).unwrap_or("0000");
    format!("@{segment}")
}

/// Hands out unique variable names for one file.
#[derive(Debug, Clone, Default)]
pub struct VariableNames {
    assigned: Vec<String>,
}

impl VariableNames {
    pub fn new() -> Self {
        Self::default()
    }

    fn clashes(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.assigned.iter().any(|other| other.to_lowercase() == lower)
    }

    /// Derive and reserve the variable name of `title`.
    pub fn assign(&mut self, title: &str) -> String {
        let cleaned: String = title
            .chars()
            .filter(|c| !matches!(c, '{' | '}'))
            .map(|c| match c {
                '/' => '.',
                '-' | ':' => '_',
                other => other,
            })
            .collect();
        let name = if cleaned.starts_with('_') {
            format!("@{}", truncate_bytes(&cleaned, MAX_NAME_LEN - 1))
        } else {
            truncate_bytes(&cleaned, MAX_NAME_LEN).to_string()
        };
        let mut unique = name.clone();
        while self.clashes(&unique) {
            unique = format!(
                "{}{}",
                truncate_bytes(&name, MAX_NAME_LEN - SUFFIX_LEN),
                random_suffix()
            );
        }
        self.assigned.push(unique.clone());
        unique
    }

    pub fn assigned(&self) -> &[String] {
        &self.assigned
    }
}

/// The `@xxxx` suffix added to a clashing name, if any.
pub fn clash_suffix(name: &str) -> Option<&str> {
    let (_, suffix) = name.rsplit_once('@')?;
    (suffix.len() == SUFFIX_LEN - 1 && suffix.chars().all(|c| c.is_ascii_hexdigit()))
        .then_some(suffix)
}

/// Eight-byte short names for the variable records, derived from long names.
///
/// Short names are uppercase, start with a letter or `@` and are unique.
pub fn short_names<'a>(long_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: Vec<String> = Vec::new();
    for long in long_names {
        let mut base: String = long
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '#' | '$' | '.'))
            .map(|c| c.to_ascii_uppercase())
            .take(8)
            .collect();
        if !base.starts_with(|c: char| c.is_ascii_alphabetic() || c == '@') {
            base = format!("V{base}").chars().take(8).collect();
        }
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while taken.contains(&candidate) {
            let digits = counter.to_string();
            let keep = 8usize.saturating_sub(digits.len());
            candidate = format!("{}{digits}", &base[..base.len().min(keep)]);
            counter += 1;
        }
        taken.push(candidate);
    }
    taken
}
