//! Record filtering for the `data:` line protocol

/// Marker that prefixes every payload-carrying record
pub const DATA_MARKER: &str = "data:";

/// Return the payload of a `data:` record, or `None` for any other record.
///
/// Matching is case-sensitive and anchored at the first byte; blank lines
/// and other fields are separators and yield `None`.
#[must_use]
pub fn strip_marker(record: &str) -> Option<&str> {
    record.strip_prefix(DATA_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_marker_once() {
        assert_eq!(strip_marker("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(strip_marker("data:data:x"), Some("data:x"));
        assert_eq!(strip_marker("data:"), Some(""));
    }

    #[test]
    fn test_rejects_non_data_records() {
        assert_eq!(strip_marker(""), None);
        assert_eq!(strip_marker(" data:{}"), None);
        assert_eq!(strip_marker("DATA:{}"), None);
        assert_eq!(strip_marker("event:message"), None);
        assert_eq!(strip_marker(": keepalive"), None);
    }
}
