use crate::client::Record;
use std::collections::HashSet;
use tracing::debug;

/// Drop records whose case-folded title was already seen.
///
/// Order is preserved and the first occurrence wins; later duplicates are
/// discarded along with their source and link.
#[must_use]
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let original_count = records.len();
    let mut seen = HashSet::with_capacity(original_count);

    let unique: Vec<Record> = records
        .into_iter()
        .filter(|record| seen.insert(record.dedupe_key()))
        .collect();

    debug!(
        "Deduplicated {} records to {} unique records",
        original_count,
        unique.len()
    );

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Source;

    fn record(source: Source, title: &str) -> Record {
        Record::new(source).with_title(Some(title))
    }

    #[test]
    fn test_first_seen_wins() {
        let records = vec![
            record(Source::CrossRef, "Deep Learning"),
            record(Source::SemanticScholar, "deep learning"),
            record(Source::IeeeXplore, "DEEP LEARNING"),
        ];

        let unique = dedupe(records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].source, Source::CrossRef);
        assert_eq!(unique[0].title, "Deep Learning");
    }

    #[test]
    fn test_only_case_is_folded() {
        let records = vec![
            record(Source::CrossRef, "Deep Learning"),
            record(Source::CrossRef, "Deep Learning."),
            record(Source::CrossRef, "Deep  Learning"),
        ];

        assert_eq!(dedupe(records).len(), 3);
    }

    #[test]
    fn test_order_is_preserved() {
        let records = vec![
            record(Source::GoogleScholar, "B"),
            record(Source::CrossRef, "A"),
            record(Source::CrossRef, "b"),
            record(Source::SemanticScholar, "C"),
        ];

        let titles: Vec<_> = dedupe(records).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_unknown_titles_collapse() {
        let records = vec![
            Record::new(Source::CrossRef),
            Record::new(Source::SemanticScholar),
        ];

        let unique = dedupe(records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].title, "Unknown");
    }
}
