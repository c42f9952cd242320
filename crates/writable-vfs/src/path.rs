//! Slash-separated path handling shared by the filesystems in this crate.
//!
//! Two kinds of paths appear: *names*, which are the relative paths accepted by filesystem
//! operations (checked with [`valid_path`]), and *keys*, which are absolute paths starting with
//! `/` used to index the in-memory store (produced by [`clean`] and [`join`]).
// Most items in this file should be marked `#[inline]`.
#![warn(clippy::missing_inline_in_public_items)]

use glob::{MatchOptions, Pattern, PatternError};


/// Options for shell-style patterns under which `*`, `?`, and `[...]` never match a `/`.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive:              true,
    require_literal_separator:   true,
    require_literal_leading_dot: false,
};

/// Whether `name` is a valid relative path: either `"."`, or a non-empty sequence of
/// `/`-separated elements, none of which is empty, `.`, or `..`.
///
/// In particular, names may not start or end with a slash.
#[inline]
#[must_use]
pub fn valid_path(name: &str) -> bool {
    if name == "." {
        return true;
    }

    !name.is_empty() && name.split('/').all(|elem| !matches!(elem, "" | "." | ".."))
}

/// Lexically normalize a path into an absolute key: repeated separators and `.` elements are
/// dropped, and `..` removes the preceding element. The result always starts with `/`, and only
/// the root key `/` ends with one.
///
/// As with [`std::path`] normalization elsewhere, `..` at the root refers to the root itself.
#[expect(
    clippy::missing_inline_in_public_items,
    reason = "this function is of nontrivial length, unlike most functions in this file",
)]
#[must_use]
pub fn clean(path: &str) -> String {
    let mut elements: Vec<&str> = Vec::new();

    for elem in path.split('/') {
        match elem {
            "" | "." => {},
            // Popping nothing at the root is fine.
            ".." => { elements.pop(); }
            normal => elements.push(normal),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for elem in elements {
        cleaned.push('/');
        cleaned.push_str(elem);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

/// Join `name` onto `base` and [`clean`] the result.
#[inline]
#[must_use]
pub fn join(base: &str, name: &str) -> String {
    clean(&format!("{base}/{name}"))
}

/// The parent of a relative name, or `"."` if the name has a single element.
#[inline]
#[must_use]
pub fn dir(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None      => ".",
    }
}

/// The final element of a key or name; `"."` for the root.
#[inline]
#[must_use]
pub fn base(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        return ".";
    }

    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None      => trimmed,
    }
}

/// Join two relative names, treating `"."` as the empty path.
#[inline]
#[must_use]
pub fn join_rel(dir: &str, name: &str) -> String {
    match (dir, name) {
        (".", _) => name.to_owned(),
        (_, ".") => dir.to_owned(),
        _        => format!("{dir}/{name}"),
    }
}

/// Whether `pattern` contains any characters with special meaning in a glob pattern.
///
/// A backslash is an ordinary character; `[` and `]` are the only way to escape a metacharacter.
#[inline]
#[must_use]
pub fn has_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Compile a pattern to be matched with [`MATCH_OPTIONS`].
///
/// `glob` reads `**` as a wildcard which crosses `/`. Here, a run of `*` means the same as a single
/// `*`, so every wildcard stays within one path element.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, PatternError> {
    let mut collapsed = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if ch != '*' || !collapsed.ends_with('*') {
            collapsed.push(ch);
        }
    }
    Pattern::new(&collapsed)
}

/// Split a pattern or name into the directory before its final `/` (or `"."` if there is none)
/// and its final element.
#[inline]
#[must_use]
pub fn split(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None      => (".", name),
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn valid() {
        for name in [".", "a", "a/b", "dir0/file01.txt", "a.b/.c"] {
            assert!(valid_path(name), "{name}");
        }
        for name in ["", "/", "/a", "a/", "a//b", "./a", "a/.", "..", "../invalid", "a/../b"] {
            assert!(!valid_path(name), "{name}");
        }
    }

    #[test]
    fn clean_paths() {
        assert_eq!(clean(""), "/");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("//a//b/"), "/a/b");
        assert_eq!(clean("/a/./b/../c"), "/a/c");
        assert_eq!(clean("/../.."), "/");
        assert_eq!(clean("a/b"), "/a/b");
    }

    #[test]
    fn join_and_split() {
        assert_eq!(join("/", "."), "/");
        assert_eq!(join("/", "a/b"), "/a/b");
        assert_eq!(join("/dir0", "file01.txt"), "/dir0/file01.txt");

        assert_eq!(dir("a/b/c"), "a/b");
        assert_eq!(dir("a"), ".");

        assert_eq!(base("/"), ".");
        assert_eq!(base("/a/b"), "b");
        assert_eq!(base("a"), "a");

        assert_eq!(join_rel(".", "a"), "a");
        assert_eq!(join_rel("a", "."), "a");
        assert_eq!(join_rel("a", "b"), "a/b");

        assert_eq!(split("a/b/*.txt"), ("a/b", "*.txt"));
        assert_eq!(split("*.txt"), (".", "*.txt"));
    }

    #[test]
    fn meta() {
        assert!(has_meta("*/*1.txt"));
        assert!(has_meta("a[bc]"));
        assert!(!has_meta("dir0/file01.txt"));
        assert!(!has_meta("back\\slash"));
    }

    #[test]
    fn stars_stay_within_an_element() {
        let pattern = compile_pattern("**/f.txt").unwrap();
        assert!(pattern.matches_with("x/f.txt", MATCH_OPTIONS));
        assert!(!pattern.matches_with("a/b/f.txt", MATCH_OPTIONS));

        assert!(compile_pattern("a**").unwrap().matches_with("abc", MATCH_OPTIONS));
        assert!(!compile_pattern("a***").unwrap().matches_with("a/b", MATCH_OPTIONS));
        assert!(compile_pattern("[**]").unwrap().matches_with("*", MATCH_OPTIONS));
        assert!(compile_pattern("[[").is_err());
    }
}
