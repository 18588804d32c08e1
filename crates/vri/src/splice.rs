//! Splicer
//!
//! Replaces body line ranges with regenerated text and adds the runtime
//! includes. Every byte outside the replaced ranges is copied through
//! unchanged, line endings included.

use crate::result::{VriError, VriResult};
use std::ops::Range;
use std::path::Path;

/// Line that anchors the runtime includes
const INCLUDE_DIRECTIVE: &str = "#include";

/// Regenerated text for a zero-based, half-open line range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Lines being replaced
    pub lines: Range<usize>,
    /// New text, `\n`-terminated lines
    pub text: String,
}

impl Replacement {
    /// Create a replacement
    #[must_use]
    pub fn new(lines: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            lines,
            text: text.into(),
        }
    }
}

/// Splice `replacements` into `original` and insert `includes` once before
/// the first `#include` line
///
/// Regenerated text takes the file's line ending when the file uses CRLF.
pub fn splice(
    path: &Path,
    original: &str,
    replacements: &[Replacement],
    includes: &[String],
) -> VriResult<String> {
    let lines: Vec<&str> = original.split_inclusive('\n').collect();
    let anchor = lines
        .iter()
        .position(|line| line.trim_start().starts_with(INCLUDE_DIRECTIVE))
        .ok_or_else(|| VriError::MissingLine {
            path: path.to_path_buf(),
            line: INCLUDE_DIRECTIVE.to_string(),
        })?;
    let newline = if lines.first().is_some_and(|line| line.ends_with("\r\n")) {
        "\r\n"
    } else {
        "\n"
    };

    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by_key(|r| r.lines.start);
    let mut pending = ordered.into_iter().peekable();

    let mut out = String::with_capacity(original.len() + original.len() / 2);
    let mut index = 0;
    while index < lines.len() {
        if index == anchor {
            for include in includes {
                out.push_str(include);
                out.push_str(newline);
            }
        }
        if let Some(replacement) = pending.next_if(|r| r.lines.start == index) {
            if newline == "\n" {
                out.push_str(&replacement.text);
            } else {
                out.push_str(&replacement.text.replace('\n', newline));
            }
            index = replacement.lines.end.max(index);
            continue;
        }
        out.push_str(lines[index]);
        index += 1;
    }
    for replacement in pending {
        out.push_str(&replacement.text.replace('\n', newline));
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn includes() -> Vec<String> {
        vec![
            "#include \"coverage.hpp\"".to_string(),
            "#include \"counting.hpp\"".to_string(),
        ]
    }

    const ORIGINAL: &str = "// header\n#include \"a.h\"\n#include \"b.h\"\nvoid f_nba() {\n    // Body\n    x = 1;\n}\nvoid g_act() {\n    // Body\n    y = 2;\n    z = 3;\n}\n";

    #[test]
    fn test_splice_replaces_ranges_and_inserts_includes_once() {
        let out = splice(
            Path::new("t.cpp"),
            ORIGINAL,
            &[
                Replacement::new(5..6, "    X;\n"),
                Replacement::new(9..11, "    Y;\n"),
            ],
            &includes(),
        )
        .unwrap();
        assert_eq!(
            out,
            "// header\n#include \"coverage.hpp\"\n#include \"counting.hpp\"\n#include \"a.h\"\n#include \"b.h\"\nvoid f_nba() {\n    // Body\n    X;\n}\nvoid g_act() {\n    // Body\n    Y;\n}\n"
        );
    }

    #[test]
    fn test_replacement_order_does_not_matter() {
        let forward = [
            Replacement::new(5..6, "    X;\n"),
            Replacement::new(9..11, "    Y;\n"),
        ];
        let backward = [forward[1].clone(), forward[0].clone()];
        let path = Path::new("t.cpp");
        assert_eq!(
            splice(path, ORIGINAL, &forward, &includes()).unwrap(),
            splice(path, ORIGINAL, &backward, &includes()).unwrap()
        );
    }

    #[test]
    fn test_empty_body_range() {
        let original = "#include \"a.h\"\nvoid f_nba() {\n    // Body\n}\n";
        let out = splice(
            Path::new("t.cpp"),
            original,
            &[Replacement::new(3..3, "    X;\n")],
            &[],
        )
        .unwrap();
        assert_eq!(out, "#include \"a.h\"\nvoid f_nba() {\n    // Body\n    X;\n}\n");
    }

    #[test]
    fn test_crlf_preserved() {
        let original = "#include \"a.h\"\r\nvoid f_nba() {\r\n    // Body\r\n    x;\r\n}\r\n";
        let out = splice(
            Path::new("t.cpp"),
            original,
            &[Replacement::new(3..4, "    X;\n    Y;\n")],
            &includes()[..1],
        )
        .unwrap();
        assert_eq!(
            out,
            "#include \"coverage.hpp\"\r\n#include \"a.h\"\r\nvoid f_nba() {\r\n    // Body\r\n    X;\r\n    Y;\r\n}\r\n"
        );
    }

    #[test]
    fn test_no_trailing_newline_kept() {
        let original = "#include \"a.h\"\nvoid f_nba() {\n    // Body\n    x;\n}";
        let out = splice(
            Path::new("t.cpp"),
            original,
            &[Replacement::new(3..4, "    X;\n")],
            &[],
        )
        .unwrap();
        assert!(out.ends_with("    X;\n}"));
    }

    #[test]
    fn test_missing_include_anchor() {
        let err = splice(Path::new("t.cpp"), "void f() {\n}\n", &[], &includes()).unwrap_err();
        assert!(matches!(err, VriError::MissingLine { .. }));
    }
}
