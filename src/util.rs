use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch (0 if the clock is before 1970)
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Turn a field name into a default label: `created_at` -> `Created at`
pub fn humanize_name(name: &str) -> String {
    let spaced: String = name
        .chars()
        .enumerate()
        .flat_map(|(i, c)| {
            let mut out = Vec::with_capacity(2);
            if c == '_' || c == '-' {
                out.push(' ');
            } else if c.is_uppercase() && i > 0 {
                out.push(' ');
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
            out
        })
        .collect();
    let trimmed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-insensitive substring match used by client-side filters
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_is_char_safe() {
        assert_eq!(truncate_str("Petição inicial", 9), "Petiçã...");
        assert_eq!(truncate_str("Petição inicial", 9).chars().count(), 9);
        assert_eq!(truncate_str("curto", 10), "curto");
        assert_eq!(truncate_str("abcdef", 2), "ab");
    }

    #[test]
    fn test_humanize_name() {
        assert_eq!(humanize_name("created_at"), "Created at");
        assert_eq!(humanize_name("publishDate"), "Publish date");
        assert_eq!(humanize_name("font-family"), "Font family");
        assert_eq!(humanize_name(""), "");
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Direito Trabalhista", "trab"));
        assert!(!contains_ignore_case("Direito Civil", "penal"));
    }
}
