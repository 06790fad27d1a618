//! Export policy configuration.

use serde::{Deserialize, Serialize};

use crate::tags::NA_REP;

/// Separator used in column titles between group names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupDelimiter {
    #[default]
    #[serde(rename = "/", alias = "slash")]
    Slash,
    #[serde(rename = ".", alias = "dot")]
    Dot,
}

impl GroupDelimiter {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupDelimiter::Slash => "/",
            GroupDelimiter::Dot => ".",
        }
    }
}

/// Brackets placed around repeat indices in flat CSV column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTags {
    pub open: String,
    pub close: String,
}

impl Default for IndexTags {
    fn default() -> Self {
        Self {
            open: "[".to_string(),
            close: "]".to_string(),
        }
    }
}

/// Policies controlling how submissions are flattened and written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Add one column per choice of every select-multiple question.
    pub split_select_multiples: bool,
    /// Split choice columns hold `1`/`0` instead of `True`/`False`.
    pub binary_select_multiples: bool,
    /// Split choice columns hold the choice name when selected.
    pub value_select_multiples: bool,
    /// Replace select values by their choice labels.
    pub show_choice_labels: bool,
    /// Add a row of labels under the title row.
    pub include_labels: bool,
    /// Write labels instead of titles.
    pub include_labels_only: bool,
    /// Titles use the element name without its group prefix.
    pub remove_group_name: bool,
    /// Shorten titles to element names even when group names are kept in
    /// file names. Always on for SAV exports.
    pub truncate_group_title: bool,
    pub group_delimiter: GroupDelimiter,
    /// Resolve media file names to attachment download URLs.
    pub include_images: bool,
    /// Add a row of HXL hashtags.
    pub include_hxl: bool,
    /// Export the review status columns.
    pub include_reviews: bool,
    pub target_language: Option<String>,
    /// Filler written for missing cells.
    pub na_rep: String,
    pub index_tags: IndexTags,
    /// Prepended to attachment download URLs.
    pub host: Option<String>,
    /// Restrict output to these column titles (extra columns are matched by name).
    pub columns: Option<Vec<String>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            split_select_multiples: true,
            binary_select_multiples: false,
            value_select_multiples: false,
            show_choice_labels: false,
            include_labels: false,
            include_labels_only: false,
            remove_group_name: false,
            truncate_group_title: false,
            group_delimiter: GroupDelimiter::Slash,
            include_images: false,
            include_hxl: false,
            include_reviews: false,
            target_language: None,
            na_rep: NA_REP.to_string(),
            index_tags: IndexTags::default(),
            host: None,
            columns: None,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split_select_multiples(mut self, enable: bool) -> Self {
        self.split_select_multiples = enable;
        self
    }

    pub fn with_binary_select_multiples(mut self, enable: bool) -> Self {
        self.binary_select_multiples = enable;
        self
    }

    pub fn with_value_select_multiples(mut self, enable: bool) -> Self {
        self.value_select_multiples = enable;
        self
    }

    pub fn with_labels(mut self, enable: bool) -> Self {
        self.include_labels = enable;
        self
    }

    pub fn with_labels_only(mut self, enable: bool) -> Self {
        self.include_labels_only = enable;
        self
    }

    pub fn with_remove_group_name(mut self, enable: bool) -> Self {
        self.remove_group_name = enable;
        self
    }

    pub fn with_truncate_group_title(mut self, enable: bool) -> Self {
        self.truncate_group_title = enable;
        self
    }

    pub fn with_group_delimiter(mut self, delimiter: GroupDelimiter) -> Self {
        self.group_delimiter = delimiter;
        self
    }

    pub fn with_hxl(mut self, enable: bool) -> Self {
        self.include_hxl = enable;
        self
    }

    pub fn with_images(mut self, enable: bool, host: Option<String>) -> Self {
        self.include_images = enable;
        self.host = host;
        self
    }

    pub fn with_reviews(mut self, enable: bool) -> Self {
        self.include_reviews = enable;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_na_rep(mut self, na_rep: impl Into<String>) -> Self {
        self.na_rep = na_rep.into();
        self
    }

    /// Whether column titles drop their group prefix.
    pub fn truncates_group_titles(&self) -> bool {
        self.truncate_group_title || self.remove_group_name
    }

    pub fn writes_title_row(&self) -> bool {
        !self.include_labels_only
    }

    pub fn writes_label_row(&self) -> bool {
        self.include_labels || self.include_labels_only
    }
}
