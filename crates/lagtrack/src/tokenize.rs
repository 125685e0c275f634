use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Split `text` into a lower-cased token set, dropping stop words.
///
/// Every kept token ending in `s` also contributes its trailing-s-stripped
/// form, so "clusters" in a title hits "cluster" in release notes. This is a
/// recall heuristic, not stemming.
pub fn tokenize(text: &str, stop_words: &HashSet<String>) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for m in word_re().find_iter(text) {
        let token = m.as_str().to_lowercase();
        if stop_words.contains(&token) {
            continue;
        }
        if let Some(singular) = token.strip_suffix('s') {
            if !singular.is_empty() {
                tokens.insert(singular.to_string());
            }
        }
        tokens.insert(token);
    }
    tokens
}

/// Build a stop-word set from any mix of string slices.
pub fn stop_word_set<'a>(lists: impl IntoIterator<Item = &'a [String]>) -> HashSet<String> {
    lists
        .into_iter()
        .flatten()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn drops_stop_words_case_insensitively() {
        let t = tokenize("Amazon EKS now supports IPv6", &stops(&["amazon", "now", "supports"]));
        let got: Vec<_> = t.into_iter().collect();
        assert_eq!(got, vec!["eks", "ipv6"]);
    }

    #[test]
    fn plural_adds_singular() {
        let t = tokenize("Hybrid Nodes", &HashSet::new());
        assert!(t.contains("nodes"));
        assert!(t.contains("node"));
        assert!(t.contains("hybrid"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn bare_s_has_no_empty_singular() {
        let t = tokenize("s", &HashSet::new());
        assert_eq!(t.len(), 1);
        assert!(!t.contains(""));
    }

    #[test]
    fn duplicates_collapse() {
        let t = tokenize("vpc VPC vpc-lattice", &HashSet::new());
        assert_eq!(t.into_iter().collect::<Vec<_>>(), vec!["lattice", "vpc"]);
    }

    #[test]
    fn stop_word_set_merges_lists() {
        let a = vec!["Now".to_string(), " ".to_string()];
        let b = vec!["aws".to_string()];
        let set = stop_word_set([a.as_slice(), b.as_slice()]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("now"));
        assert!(set.contains("aws"));
    }
}
