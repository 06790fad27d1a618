//! Well-known submission keys and output column names.

pub const ID: &str = "_id";
pub const UUID: &str = "_uuid";
pub const SUBMISSION_TIME: &str = "_submission_time";
pub const INDEX: &str = "_index";
pub const PARENT_TABLE_NAME: &str = "_parent_table_name";
pub const PARENT_INDEX: &str = "_parent_index";
pub const TAGS: &str = "_tags";
pub const NOTES: &str = "_notes";
pub const VERSION: &str = "_version";
pub const DURATION: &str = "_duration";
pub const SUBMITTED_BY: &str = "_submitted_by";
pub const ATTACHMENTS: &str = "_attachments";
pub const DATE_MODIFIED: &str = "_date_modified";
pub const TOTAL_MEDIA: &str = "_total_media";
pub const MEDIA_COUNT: &str = "_media_count";
pub const MEDIA_ALL_RECEIVED: &str = "_media_all_received";
pub const REVIEW_STATUS: &str = "_review_status";
pub const REVIEW_COMMENT: &str = "_review_comment";
pub const REVIEW_DATE: &str = "_review_date";

/// Columns exported for every section even though the form does not declare them.
pub const EXTRA_FIELDS: [&str; 11] = [
    ID,
    UUID,
    SUBMISSION_TIME,
    INDEX,
    PARENT_TABLE_NAME,
    PARENT_INDEX,
    TAGS,
    NOTES,
    VERSION,
    DURATION,
    SUBMITTED_BY,
];

/// Metadata columns appended to the single-sheet flat CSV export.
pub const FLAT_EXTRA_FIELDS: [&str; 12] = [
    ID,
    UUID,
    SUBMISSION_TIME,
    DATE_MODIFIED,
    TAGS,
    NOTES,
    VERSION,
    DURATION,
    SUBMITTED_BY,
    TOTAL_MEDIA,
    MEDIA_COUNT,
    MEDIA_ALL_RECEIVED,
];

pub const REVIEW_FIELDS: [&str; 3] = [REVIEW_STATUS, REVIEW_COMMENT, REVIEW_DATE];

/// Separator used when joining `_tags`.
pub const TAG_SEPARATOR: &str = ",";
/// Separator used when joining `_notes`.
pub const NOTE_SEPARATOR: &str = "\r\n";

/// Suffixes of the columns derived from a geopoint, in output order.
pub const GEOPOINT_SUFFIXES: [&str; 4] = ["latitude", "longitude", "altitude", "precision"];

/// Default filler for missing cells.
pub const NA_REP: &str = "n/a";
