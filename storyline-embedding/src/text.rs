//! Title tokenization and set similarity

use std::collections::HashSet;

/// Words too common in headlines to signal that two titles share a story
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "these", "those", "into", "onto",
    "over", "under", "about", "after", "before", "than", "then", "them", "they", "their",
    "there", "here", "your", "you", "yours", "our", "ours", "his", "her", "hers", "she",
    "him", "its", "are", "was", "were", "will", "would", "could", "should", "might", "must",
    "has", "have", "had", "having", "been", "being", "does", "did", "doing", "not", "but",
    "can", "cant", "dont", "doesnt", "isnt", "wont", "how", "why", "what", "when", "where",
    "who", "whom", "which", "while", "now", "new", "more", "most", "less", "just", "also",
    "still", "all", "any", "some", "out", "off", "via", "per", "amid", "says", "said",
    "say", "get", "gets", "got", "make", "makes", "made", "one", "two", "first", "next",
    "big", "top", "best", "way", "ways", "time", "today", "week", "year", "years", "like",
    "back", "own", "too", "very", "much", "many", "each", "every", "other", "again",
    "report", "reports", "update", "updates", "announces", "announced", "announce",
    "launches", "launched", "releases", "released", "unveils", "unveiled", "introduces",
    "introduced", "adds", "added",
];

/// Significant lowercase tokens of a headline
///
/// Apostrophes are dropped, every other non-alphanumeric character splits
/// words, and tokens shorter than three characters or listed in
/// [`STOPWORDS`] are discarded.
pub fn tokenize_title(title: &str) -> HashSet<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '\u{2018}'))
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Jaccard index |a ∩ b| / |a ∪ b|, zero when either set is empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tokenize_title() {
        let tokens = tokenize_title("OpenAI's new GPT-5 model: what you need to know");
        assert_eq!(tokens, set(&["openais", "gpt", "model", "need", "know"]));
    }

    #[test]
    fn test_tokenize_curly_apostrophe() {
        let tokens = tokenize_title("Apple\u{2019}s MacBook");
        assert_eq!(tokens, set(&["apples", "macbook"]));
    }

    #[test]
    fn test_tokenize_only_noise() {
        assert!(tokenize_title("A is to B, and the 5").is_empty());
        assert!(tokenize_title("").is_empty());
    }

    #[test]
    fn test_jaccard_boundaries() {
        let a = set(&["openai", "gpt"]);
        assert_eq!(jaccard(&HashSet::new(), &a), 0.0);
        assert_eq!(jaccard(&a, &HashSet::new()), 0.0);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a = set(&["openai", "gpt"]);
        let b = set(&["openai", "gpt", "model"]);
        assert!((jaccard(&a, &b) - 2.0 / 3.0).abs() < 1e-9);
    }
}
