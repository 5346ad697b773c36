use std::collections::HashSet;

use regex::Regex;

lazy_static::lazy_static! {
    static ref MENTION: Regex = Regex::new(r"@([A-Za-z0-9_]+)").expect("mention regex is valid");
}

/// Usernames mentioned as `@name` in `text`, once each, in order of first mention
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(String::from)
        .collect()
}
