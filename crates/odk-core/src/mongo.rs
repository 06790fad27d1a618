//! Escaping of field names that the document store cannot hold as keys.
//!
//! A leading `$` and every `.` are replaced by their base64 encodings. The
//! query operators in [`MONGO_OPERATORS`] pass through untouched.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const MONGO_OPERATORS: [&str; 11] = [
    "$or", "$and", "$exists", "$in", "$gt", "$gte", "$lt", "$lte", "$regex", "$options", "$all",
];

static ENCODED_DOLLAR: LazyLock<String> = LazyLock::new(|| STANDARD.encode("$"));
static ENCODED_DOT: LazyLock<String> = LazyLock::new(|| STANDARD.encode("."));

/// Whether `key` must be escaped before it can be stored.
pub fn is_invalid_for_mongo(key: &str) -> bool {
    !MONGO_OPERATORS.contains(&key) && (key.starts_with('$') || key.contains('.'))
}

/// Escape a leading `$` and every `.` in `key`.
pub fn encode_path(key: &str) -> String {
    let escaped = match key.strip_prefix('$') {
        Some(rest) => format!("{}{rest}", ENCODED_DOLLAR.as_str()),
        None => key.to_string(),
    };
    escaped.replace('.', ENCODED_DOT.as_str())
}

/// Inverse of [`encode_path`].
pub fn decode_path(key: &str) -> String {
    let unescaped = match key.strip_prefix(ENCODED_DOLLAR.as_str()) {
        Some(rest) => format!("${rest}"),
        None => key.to_string(),
    };
    unescaped.replace(ENCODED_DOT.as_str(), ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_dollar_prefix_and_dots() {
        assert_eq!(encode_path("$price.usd"), "JA==priceLg==usd");
        assert_eq!(encode_path("a.b"), "aLg==b");
        assert_eq!(encode_path("group/name"), "group/name");
        assert_eq!(decode_path("JA==priceLg==usd"), "$price.usd");
        assert_eq!(decode_path("aLg==b"), "a.b");
    }

    #[test]
    fn operators_are_valid_keys() {
        assert!(!is_invalid_for_mongo("$or"));
        assert!(!is_invalid_for_mongo("group/name"));
        assert!(is_invalid_for_mongo("$price"));
        assert!(is_invalid_for_mongo("a.b"));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(key in "[$]?[a-z_/.]{0,24}") {
            prop_assert_eq!(decode_path(&encode_path(&key)), key);
        }

        #[test]
        fn encoded_keys_are_storable(key in "[$]?[a-z_/.]{0,24}") {
            let encoded = encode_path(&key);
            prop_assert!(!encoded.starts_with('$'));
            prop_assert!(!encoded.contains('.'));
        }
    }
}
