//! Percent-encoding for request paths and query values.
//!
//! Two encodings are used on the wire:
//!
//! - **URL encoding** leaves only `A-Z a-z 0-9 - _ . ~` untouched.
//! - **Access-control encoding** additionally encodes `~`. Signed requests are
//!   canonicalised with it, so the characters the messaging protocol reserves
//!   (`*!'()[]~`) never reach the signature in literal form.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped by [`url_encode`].
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped by [`pam_encode`].
const PAM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Separator used for channel and channel group lists.
pub const LIST_SEPARATOR: &str = ",";

/// Percent-encode a single path or query component.
#[must_use]
pub fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, URL_ENCODE_SET).to_string()
}

/// Percent-encode a component with the access-control character set.
#[must_use]
pub fn pam_encode(value: &str) -> String {
    utf8_percent_encode(value, PAM_ENCODE_SET).to_string()
}

/// Encode every entry with [`pam_encode`] and join them with commas.
///
/// An empty list renders as a single `,`, which the service reads as
/// "no channels" in a path segment.
#[must_use]
pub fn encode_list(values: &[String]) -> String {
    if values.is_empty() {
        return LIST_SEPARATOR.to_string();
    }
    values
        .iter()
        .map(|v| pam_encode(v))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Join raw list entries for use as a query value.
///
/// Query values are encoded as a whole when the query is rendered, so the
/// entries are left untouched here.
#[must_use]
pub fn join_list(values: &[String]) -> String {
    values.join(LIST_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode_json_string() {
        assert_eq!(url_encode("\"test\""), "%22test%22");
        assert_eq!(url_encode("[1,2,3]"), "%5B1%2C2%2C3%5D");
    }

    #[test]
    fn test_url_encode_keeps_unreserved() {
        assert_eq!(url_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(url_encode("a b"), "a%20b");
    }

    #[test]
    fn test_pam_encode_reserved() {
        assert_eq!(pam_encode("*!'()[]~"), "%2A%21%27%28%29%5B%5D%7E");
        assert_eq!(pam_encode("room.1"), "room.1");
    }

    #[test]
    fn test_non_ascii_is_encoded() {
        assert_eq!(url_encode("ü"), "%C3%BC");
        assert_eq!(pam_encode("чат"), "%D1%87%D0%B0%D1%82");
    }

    #[test]
    fn test_encode_list() {
        let channels = vec!["a b".to_string(), "c,d".to_string()];
        assert_eq!(encode_list(&channels), "a%20b,c%2Cd");
        assert_eq!(encode_list(&[]), ",");
    }
}
