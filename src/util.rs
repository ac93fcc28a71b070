use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Elements present in both collections, deduplicated. Output order is not
/// guaranteed to match either input.
pub fn intersection(a: &[String], b: &[String]) -> Vec<String> {
    let lookup: HashSet<&str> = a.iter().map(String::as_str).collect();
    let hits: Vec<String> = b
        .iter()
        .filter(|item| lookup.contains(item.as_str()))
        .cloned()
        .collect();
    dedupe(&hits)
}

/// Remove later repeats, preserving first-seen order.
pub fn dedupe(items: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.as_str()) {
            out.push(item.clone());
        }
    }
    out
}

/// Linear membership test.
pub fn contains_str(items: &[String], target: &str) -> bool {
    items.iter().any(|item| item == target)
}

/// True if `item` matches any of the given glob patterns (`*` and `?`
/// wildcards). Patterns that fail to translate are skipped with a warning.
pub fn matches_glob_of(item: &str, globs: &[String]) -> bool {
    for pattern in globs {
        match glob_regex(pattern) {
            Ok(re) => {
                if re.is_match(item) {
                    return true;
                }
            }
            Err(e) => {
                warn!("Skipping unusable glob pattern {:?}: {}", pattern, e);
            }
        }
    }
    debug!("{:?} matches none of the configured globs", item);
    false
}

/// Translate a glob pattern into an anchored regex.
fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => {
                let mut buf = [0u8; 4];
                translated.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    translated.push('$');
    Regex::new(&translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn as_set(items: Vec<String>) -> HashSet<String> {
        items.into_iter().collect()
    }

    #[test]
    fn test_intersection_commutative_as_set() {
        let a = strings(&["Netflix", "Hulu", "Mubi"]);
        let b = strings(&["Mubi", "Netflix", "Max"]);
        assert_eq!(
            as_set(intersection(&a, &b)),
            as_set(intersection(&b, &a)),
        );
        assert_eq!(
            as_set(intersection(&a, &b)),
            as_set(strings(&["Netflix", "Mubi"])),
        );
    }

    #[test]
    fn test_intersection_with_self_is_dedupe() {
        let a = strings(&["Drama", "Crime", "Drama"]);
        assert_eq!(as_set(intersection(&a, &a)), as_set(dedupe(&a)));
    }

    #[test]
    fn test_intersection_deduplicates() {
        let a = strings(&["Netflix"]);
        let b = strings(&["Netflix", "Netflix"]);
        assert_eq!(intersection(&a, &b), strings(&["Netflix"]));
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let items = strings(&["b", "a", "b", "c", "a"]);
        assert_eq!(dedupe(&items), strings(&["b", "a", "c"]));
    }

    #[test]
    fn test_contains_str() {
        let items = strings(&["foo", "bar"]);
        assert!(contains_str(&items, "bar"));
        assert!(!contains_str(&items, "baz"));
    }

    #[test]
    fn test_glob_matching() {
        let globs = strings(&["The *", "Alien?"]);
        assert!(matches_glob_of("The Mission", &globs));
        assert!(matches_glob_of("Aliens", &globs));
        assert!(!matches_glob_of("Alien", &globs));
        assert!(!matches_glob_of("Mission", &globs));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let globs = strings(&["8 1/2 (*)"]);
        assert!(matches_glob_of("8 1/2 (1963)", &globs));
        assert!(!matches_glob_of("8 1X2 (1963)", &globs));
    }

    #[test]
    fn test_no_globs_matches_nothing() {
        assert!(!matches_glob_of("Anything", &[]));
    }
}
