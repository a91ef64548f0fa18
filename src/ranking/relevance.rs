use crate::client::Record;
use similar::{capture_diff_slices, Algorithm, DiffOp};

/// Canonical token-sorted form used for scoring.
///
/// Lowercases and drops Latin-1 supplement characters (U+0080 to U+00FF),
/// turns everything but letters, digits and `_` into a separator, then
/// sorts the tokens so word order stops mattering.
#[must_use]
pub fn token_sort_key(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !('\u{80}'..='\u{ff}').contains(c))
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Characters shared by a minimal insert/delete edit script, i.e. the LCS length
fn matching_chars(a: &[char], b: &[char]) -> usize {
    capture_diff_slices(Algorithm::Myers, a, b)
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum()
}

/// `numerator / denominator` rounded to the nearest integer, ties to even
fn round_half_even(numerator: usize, denominator: usize) -> usize {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    match (2 * remainder).cmp(&denominator) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    }
}

/// Token-order-insensitive similarity between a title and the keyword, 0 to 100.
///
/// Indel ratio of the token-sorted strings: `100 * 2M / (len_a + len_b)`
/// where `M` is the number of matching characters.
#[must_use]
pub fn relevance_score(title: &str, keyword: &str) -> u8 {
    let title_key: Vec<char> = token_sort_key(title).chars().collect();
    let keyword_key: Vec<char> = token_sort_key(keyword).chars().collect();

    if title_key.is_empty() || keyword_key.is_empty() {
        return 0;
    }

    let matches = matching_chars(&title_key, &keyword_key);
    let score = round_half_even(200 * matches, title_key.len() + keyword_key.len());
    // matches never exceeds the shorter side, so score is at most 100
    u8::try_from(score.min(100)).unwrap_or(100)
}

/// Score, sort by descending relevance and keep the top `limit` records.
///
/// The sort is stable: equal scores keep their incoming order.
#[must_use]
pub fn rank(mut records: Vec<Record>, keyword: &str, limit: usize) -> Vec<Record> {
    for record in &mut records {
        record.relevance = Some(relevance_score(&record.title, keyword));
    }

    records.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Source;

    fn record(title: &str) -> Record {
        Record::new(Source::CrossRef).with_title(Some(title))
    }

    #[test]
    fn test_token_sort_key() {
        assert_eq!(token_sort_key("Neural Networks for Graphs"), "for graphs networks neural");
        assert_eq!(token_sort_key("  Graph-Neural   networks! "), "graph networks neural");
        assert_eq!(token_sort_key("!!!"), "");
        assert_eq!(token_sort_key("Schrödinger snake_case"), "schrdinger snake_case");
    }

    #[test]
    fn test_identical_token_multisets_score_100() {
        assert_eq!(relevance_score("Graph Neural Networks", "graph neural networks"), 100);
        assert_eq!(relevance_score("Networks, Neural Graph", "graph neural networks"), 100);
    }

    #[test]
    fn test_empty_sides_score_zero() {
        assert_eq!(relevance_score("", "graphs"), 0);
        assert_eq!(relevance_score("Graphs", "--"), 0);
    }

    #[test]
    fn test_known_token_sort_ratios() {
        let cases = [
            ("Neural Networks for Graphs", "graph neural networks", 89),
            ("Unrelated Paper", "graph neural networks", 44),
            ("Deep Learning: A Review!", "deep learning", 74),
            ("Attention Is All You Need", "attention", 53),
            (
                "BERT: Pre-training of Deep Bidirectional Transformers for Language Understanding",
                "bert",
                10,
            ),
            ("Schrödinger bridges", "schrodinger bridges", 97),
            ("snake_case names", "snake case names", 69),
            ("abcdef", "abcd", 80),
            ("abcx", "abcd", 75),
            ("ab", "ba", 50),
            ("a", "b", 0),
        ];

        for (title, keyword, expected) in cases {
            assert_eq!(
                relevance_score(title, keyword),
                expected,
                "score for {title:?} against {keyword:?}"
            );
        }
    }

    #[test]
    fn test_halfway_scores_round_to_even() {
        // 2 * 7 / 16 = 87.5
        assert_eq!(relevance_score("abcdefg", "abcdefgxy"), 88);
        // 2 * 3 / 48 = 12.5
        let keyword = format!("abc {}", "x".repeat(41));
        assert_eq!(relevance_score("abc", &keyword), 12);
    }

    #[test]
    fn test_longer_shared_prefix_ranks_first() {
        let ranked = rank(vec![record("abcx"), record("abcdef")], "abcd", 2);
        let titles: Vec<_> = ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["abcdef", "abcx"]);
        assert_eq!(ranked[0].relevance, Some(80));
        assert_eq!(ranked[1].relevance, Some(75));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let records = vec![
            record("Unrelated Paper"),
            record("Neural Networks for Graphs"),
            record("Graph Neural Networks"),
        ];

        let ranked = rank(records, "graph neural networks", 3);
        let titles: Vec<_> = ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Graph Neural Networks", "Neural Networks for Graphs", "Unrelated Paper"]
        );
        assert_eq!(ranked[0].relevance, Some(100));

        let top = rank(ranked, "graph neural networks", 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].title, "Graph Neural Networks");
    }

    #[test]
    fn test_ties_keep_incoming_order() {
        let records = vec![
            Record::new(Source::GoogleScholar).with_title(Some("Alpha Beta")),
            Record::new(Source::CrossRef).with_title(Some("Beta Alpha")),
        ];

        let ranked = rank(records, "alpha beta", 10);
        assert_eq!(ranked[0].source, Source::GoogleScholar);
        assert_eq!(ranked[1].source, Source::CrossRef);
        assert_eq!(ranked[0].relevance, ranked[1].relevance);
    }
}
