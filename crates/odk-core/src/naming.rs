//! Output sheet and file names.

/// Longest worksheet name a workbook accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// How a sink names the sheets it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetNaming {
    /// One file per section inside an archive; `/` in section names becomes `_`.
    File,
    /// Workbook worksheets: at most 31 characters, unique.
    Worksheet,
}

impl SheetNaming {
    /// Names for `sections`, in order.
    pub fn assign<'a>(self, sections: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for section in sections {
            let name = match self {
                SheetNaming::File => unique_file_stem(&section_file_stem(section), &names),
                SheetNaming::Worksheet => valid_sheet_name(&section_file_stem(section), &names),
            };
            names.push(name);
        }
        names
    }
}

/// `children/cartoons` becomes `children_cartoons`.
pub fn section_file_stem(section: &str) -> String {
    section.split('/').collect::<Vec<_>>().join("_")
}

fn unique_file_stem(stem: &str, existing: &[String]) -> String {
    let taken = |name: &str| existing.iter().any(|other| other == name);
    let mut candidate = stem.to_string();
    let mut i = 1;
    while taken(&candidate) {
        candidate = format!("{stem}{i}");
        i += 1;
    }
    candidate
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// A worksheet name derived from `desired` that is not in `existing`.
///
/// Names are cut to 31 characters. A clash is resolved by appending 1, 2, …
/// after trimming the base so that the result still fits. Worksheet names
/// compare case-insensitively.
pub fn valid_sheet_name(desired: &str, existing: &[String]) -> String {
    let cleaned: String = desired
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let base = truncate_chars(&cleaned, MAX_SHEET_NAME_LEN);
    let taken = |name: &str| existing.iter().any(|other| other.to_lowercase() == name.to_lowercase());

    let mut generated = base.clone();
    let mut i: usize = 1;
    while taken(&generated) {
        let allowed = MAX_SHEET_NAME_LEN - i.to_string().len();
        generated = format!("{}{i}", truncate_chars(&base, allowed));
        i += 1;
    }
    generated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_sheet_names_are_truncated_and_deduplicated() {
        let long = "a".repeat(40);
        let first = valid_sheet_name(&long, &[]);
        assert_eq!(first.len(), 31);
        let second = valid_sheet_name(&long, std::slice::from_ref(&first));
        assert_eq!(second, format!("{}1", "a".repeat(30)));
        let third = valid_sheet_name(&long, &[first, second]);
        assert_eq!(third, format!("{}2", "a".repeat(30)));
    }

    #[test]
    fn short_duplicates_just_get_a_number() {
        let names = SheetNaming::Worksheet.assign(["data", "Data", "a/b"]);
        assert_eq!(names, vec!["data", "Data1", "a_b"]);
    }

    #[test]
    fn file_names_flatten_section_paths() {
        let names = SheetNaming::File.assign(["survey", "children/cartoons", "children_cartoons"]);
        assert_eq!(names, vec!["survey", "children_cartoons", "children_cartoons1"]);
    }
}
