//! Search query construction
//!
//! Turns the configured qualifiers and the start of the search window into a
//! GitHub search query. Any `sort:` or `created:` qualifier in the
//! configuration is dropped and replaced by the ones the job relies on:
//! newest first, created at or after the window start.

use chrono::NaiveDateTime;

const SORT_QUALIFIER_FIELD: &str = "sort:";
const CREATED_QUALIFIER_FIELD: &str = "created:";
const SORT_CREATED_DESC: &str = "sort:created-desc";
const CREATED_GTE: &str = "created:>=";

/// Timestamp layout for the `created:` bound (ISO-8601, no offset suffix)
const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Build the issue search query for a window starting at `window_start`
///
/// Qualifiers are kept in order unless they start with `sort:` or
/// `created:`; the match is anchored at the beginning, so `label:sort-me`
/// survives.
///
/// ```
/// use chrono::NaiveDate;
/// use issue_watch::query::build;
///
/// let start = NaiveDate::from_ymd_opt(2025, 11, 9).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let query = build(&["label:bug", "sort:updated"], start);
/// assert_eq!(query, "label:bug sort:created-desc created:>=2025-11-09T12:00:00");
/// ```
pub fn build<S: AsRef<str>>(qualifiers: &[S], window_start: NaiveDateTime) -> String {
    let mut tokens: Vec<String> = qualifiers
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|q| !q.starts_with(SORT_QUALIFIER_FIELD) && !q.starts_with(CREATED_QUALIFIER_FIELD))
        .map(str::to_string)
        .collect();

    tokens.push(SORT_CREATED_DESC.to_string());
    tokens.push(format!("{CREATED_GTE}{}", window_start.format(WINDOW_FORMAT)));
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn nov9(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn count_prefix(query: &str, prefix: &str) -> usize {
        query.split(' ').filter(|t| t.starts_with(prefix)).count()
    }

    #[test]
    fn replaces_configured_sort_and_created_qualifiers() {
        let qualifiers = [
            "label:bug",
            "is:open",
            "sort:created-asc",
            "created:<=2025-11-09T12:00:00",
        ];
        let query = build(&qualifiers, nov9(12, 0, 0));

        assert!(query.contains("label:bug"));
        assert!(query.contains("is:open"));
        assert!(query.contains("sort:created-desc"));
        assert!(query.contains("created:>=2025-11-09T12:00"));
        assert!(!query.contains("sort:created-asc"));
        assert!(!query.contains("created:<="));
    }

    #[test]
    fn keeps_order_and_appends_window_last() {
        let query = build(&["is:issue", "language:Rust", "is:open"], nov9(8, 30, 15));
        assert_eq!(
            query,
            "is:issue language:Rust is:open sort:created-desc created:>=2025-11-09T08:30:15"
        );
    }

    #[test]
    fn empty_qualifiers_yield_only_defaults() {
        let none: [&str; 0] = [];
        assert_eq!(
            build(&none, nov9(0, 0, 0)),
            "sort:created-desc created:>=2025-11-09T00:00:00"
        );
    }

    #[test]
    fn prefix_match_is_anchored() {
        let query = build(&["label:sort-priority", "-created:2020"], nov9(1, 2, 3));
        assert!(query.starts_with("label:sort-priority -created:2020 "));
    }

    #[test]
    fn exactly_one_sort_and_created_token() {
        let cases: Vec<Vec<&str>> = vec![
            vec![],
            vec!["sort:comments", "sort:reactions", "created:>2024-01-01"],
            vec!["created:2024-01-01..2024-02-01", "is:open"],
            vec!["label:\"good first issue\"", "sort:created-desc"],
        ];
        for qualifiers in cases {
            let query = build(&qualifiers, nov9(23, 59, 59));
            assert_eq!(count_prefix(&query, "sort:"), 1, "{query}");
            assert_eq!(count_prefix(&query, "created:"), 1, "{query}");
        }
    }

    #[test]
    fn fractional_seconds_are_truncated() {
        let start = NaiveDate::from_ymd_opt(2025, 11, 9)
            .unwrap()
            .and_hms_nano_opt(12, 0, 0, 987_654_321)
            .unwrap();
        assert!(build(&["is:open"], start).ends_with("created:>=2025-11-09T12:00:00"));
    }

    #[test]
    fn same_inputs_same_query() {
        let qualifiers = vec!["is:issue".to_string(), "label:bug".to_string()];
        assert_eq!(build(&qualifiers, nov9(5, 0, 0)), build(&qualifiers, nov9(5, 0, 0)));
    }
}
