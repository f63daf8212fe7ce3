//! Compact property map parsing.
//!
//! The wire form is `{ name1: value1, name2: value2 }` with unquoted names,
//! decimal scalars, bracketed vectors and quoted one-line strings. Commas
//! inside brackets or quotes do not split entries.

/// Splits `text` on `separator` at nesting depth zero, respecting `[...]`,
/// `{...}` and double-quoted runs.
#[must_use]
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' | '{' if !in_quotes => depth += 1,
            ']' | '}' if !in_quotes => depth -= 1,
            c if c == separator && depth == 0 && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parses a serialized property map into ordered `(name, value-text)` pairs.
///
/// Returns `None` when the outer braces are missing. An empty object yields
/// an empty vector. Trailing whitespace is tolerated.
#[must_use]
pub fn parse_property_map(serialized: &str) -> Option<Vec<(&str, &str)>> {
    let trimmed = serialized.trim();
    let inner = trimmed.strip_prefix('{')?.strip_suffix('}')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in split_top_level(inner, ',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        // Split on the first top-level colon; values may contain colons
        // inside quotes (Windows paths).
        let mut name = entry;
        let mut value = "";
        let mut in_quotes = false;
        for (i, c) in entry.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ':' if !in_quotes => {
                    name = entry[..i].trim();
                    value = entry[i + 1..].trim();
                    break;
                }
                _ => {}
            }
        }
        entries.push((name, value));
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_map() {
        let entries = parse_property_map("{ opacity: 0.5, visible: true }").unwrap();
        assert_eq!(entries, vec![("opacity", "0.5"), ("visible", "true")]);
    }

    #[test]
    fn commas_inside_brackets_do_not_split() {
        let entries = parse_property_map("{ translation: [1,2], name: \"a, b\" }").unwrap();
        assert_eq!(entries, vec![("translation", "[1,2]"), ("name", "\"a, b\"")]);
    }

    #[test]
    fn empty_object() {
        assert!(parse_property_map("{}").unwrap().is_empty());
        assert!(parse_property_map("{ }").unwrap().is_empty());
    }

    #[test]
    fn missing_braces_rejected() {
        assert!(parse_property_map("opacity: 0.5").is_none());
    }

    #[test]
    fn colon_inside_quotes_stays_in_value() {
        let entries = parse_property_map("{ image_path: \"C:/media/a.png\" }").unwrap();
        assert_eq!(entries, vec![("image_path", "\"C:/media/a.png\"")]);
    }
}
