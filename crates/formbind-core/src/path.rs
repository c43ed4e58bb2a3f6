//! # Property Paths
//!
//! Helpers for the input-map key convention: a context prefix is either
//! empty or ends with `"."`; nested objects extend it with
//! `name + "."` and list elements with `name + "[index]."`. Failure
//! messages carry fully-qualified paths built from these helpers, so the
//! convention is observable to callers and must stay stable.

/// Qualify a property name with a context prefix.
pub fn qualify(prefix: &str, property: &str) -> String {
    format!("{prefix}{property}")
}

/// Child-context prefix for a nested-object property.
pub fn nested_prefix(prefix: &str, property: &str) -> String {
    format!("{prefix}{property}.")
}

/// Child-context prefix for one element of a list property.
pub fn indexed_prefix(prefix: &str, property: &str, index: usize) -> String {
    format!("{prefix}{property}[{index}].")
}

/// Strip a context prefix from a fully-qualified path.
///
/// Paths recorded by foreign contexts (or hand-built by callers) may not
/// start with the prefix; those are returned unchanged.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Every dot-delimited ancestor of a path, shortest first, ending with
/// the path itself.
///
/// `[index]` segments are part of their property segment, so
/// `"lines[2].amount"` yields `"lines[2]"` then `"lines[2].amount"`.
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for (i, ch) in path.char_indices() {
        if ch == '.' {
            out.push(&path[..i]);
        }
    }
    if !path.is_empty() {
        out.push(path);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualify_concatenates() {
        assert_eq!(qualify("", "id"), "id");
        assert_eq!(qualify("address.", "city"), "address.city");
    }

    #[test]
    fn nested_prefix_appends_dot() {
        assert_eq!(nested_prefix("", "address"), "address.");
        assert_eq!(nested_prefix("order.", "address"), "order.address.");
    }

    #[test]
    fn indexed_prefix_appends_index_and_dot() {
        assert_eq!(indexed_prefix("", "lines", 2), "lines[2].");
        assert_eq!(indexed_prefix("order.", "lines", 0), "order.lines[0].");
    }

    #[test]
    fn ancestors_expand_dots() {
        assert_eq!(ancestors("a.b.c"), vec!["a", "a.b", "a.b.c"]);
        assert_eq!(ancestors("a"), vec!["a"]);
        assert!(ancestors("").is_empty());
    }

    #[test]
    fn ancestors_keep_index_segments_whole() {
        assert_eq!(
            ancestors("lines[2].amount"),
            vec!["lines[2]", "lines[2].amount"]
        );
    }

    #[test]
    fn strip_prefix_is_lenient() {
        assert_eq!(strip_prefix("address.city", "address."), "city");
        assert_eq!(strip_prefix("other.city", "address."), "other.city");
    }
}
