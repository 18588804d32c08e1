//! Body locator
//!
//! Finds the evaluation functions of a Verilator implementation file and the
//! line range of their statements:
//!
//! ```text
//! VL_INLINE_OPT void Vtop___024root___nba_sequent__TOP__0(Vtop___024root* vlSelf) {
//!     (void)vlSelf;  // Prevent unused variable warning
//!     Vtop__Syms* const __restrict vlSymsp VL_ATTR_UNUSED = vlSelf->vlSymsp;
//!     // Body
//!     vlSelf->count = ...;      <- start_line
//! }                             <- end_line
//! ```

use crate::config::InstrumentConfig;
use crate::result::{VriError, VriResult};
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Evaluation phase a generated function implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BodyCategory {
    /// `nba`: non-blocking assignment updates
    NonBlockingAssign,
    /// `act`: active region
    Active,
    /// `stl`: settle/initialization
    Settle,
}

impl BodyCategory {
    /// All categories, in matching priority
    pub const ALL: [Self; 3] = [Self::NonBlockingAssign, Self::Active, Self::Settle];

    /// Substring of a function name selecting this category
    #[must_use]
    pub const fn substring(self) -> &'static str {
        match self {
            Self::NonBlockingAssign => "nba",
            Self::Active => "act",
            Self::Settle => "stl",
        }
    }

    /// Category of a function, if it has one
    #[must_use]
    pub fn from_function_name(name: &str) -> Option<Self> {
        let unqualified = name.rsplit("::").next().unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|category| unqualified.contains(category.substring()))
    }
}

/// Line range of one eligible function body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionBody {
    /// Implementation file
    pub file: PathBuf,
    /// Evaluation phase
    pub category: BodyCategory,
    /// Function name as written in the definition
    pub function: String,
    /// Zero-based line after the body marker
    pub start_line: usize,
    /// Zero-based line of the closing brace, not part of the body
    pub end_line: usize,
}

impl FunctionBody {
    /// Lines of the body
    #[must_use]
    pub const fn lines(&self) -> Range<usize> {
        self.start_line..self.end_line
    }
}

/// Locate every eligible body in `text`, in file order
///
/// A file that already contains the marker include yields nothing past that
/// line.
pub fn locate_bodies(
    path: &Path,
    text: &str,
    config: &InstrumentConfig,
) -> VriResult<Vec<FunctionBody>> {
    let lines: Vec<&str> = text.lines().collect();
    let marker_include = config.marker_include();
    let mut bodies = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        if marker_include.is_some_and(|marker| line.trim() == marker) {
            debug!(path = %path.display(), line = index + 1, "already carries runtime include");
            break;
        }
        let Some(function) = function_header(line, &config.function_prefixes) else {
            index += 1;
            continue;
        };
        let Some(category) = BodyCategory::from_function_name(function) else {
            index += 1;
            continue;
        };

        let marker = (index + 1..lines.len())
            .find(|&i| lines[i].trim() == config.body_marker)
            .ok_or_else(|| VriError::MissingBodyMarker {
                path: path.to_path_buf(),
                function: function.to_string(),
                line: index,
                marker: config.body_marker.clone(),
            })?;
        let start_line = marker + 1;
        let end_line = (start_line..lines.len())
            .find(|&i| lines[i].trim_end() == "}")
            .ok_or_else(|| VriError::UnclosedBody {
                path: path.to_path_buf(),
                function: function.to_string(),
            })?;

        debug!(
            function,
            ?category,
            start = start_line + 1,
            end = end_line + 1,
            "located body"
        );
        bodies.push(FunctionBody {
            file: path.to_path_buf(),
            category,
            function: function.to_string(),
            start_line,
            end_line,
        });
        index = end_line + 1;
    }

    Ok(bodies)
}

/// Name of the function a definition line opens, if it is one
fn function_header<'l>(line: &'l str, prefixes: &[String]) -> Option<&'l str> {
    if !line.trim_end().ends_with('{') {
        return None;
    }
    let stripped = line.trim_start();
    let rest = prefixes
        .iter()
        .find_map(|prefix| stripped.strip_prefix(prefix.as_str()))?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    let starts_ident = name
        .trim_start_matches(':')
        .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
    (starts_ident && rest[end..].starts_with('(')).then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
// Verilated -*- C++ -*-
#include \"Vtop__pch.h\"
#include \"Vtop___024root.h\"

void Vtop___024root___eval_triggers__act(Vtop___024root* vlSelf);

VL_INLINE_OPT void Vtop___024root___nba_sequent__TOP__0(Vtop___024root* vlSelf) {
    (void)vlSelf;  // Prevent unused variable warning
    // Body
    vlSelf->count = ((IData)(1U) + vlSelf->count);
    if (vlSelf->rst) {
        vlSelf->count = 0U;
    }
}

void Vtop___024root___eval_debug_assertions(Vtop___024root* vlSelf) {
    // Body
    if (VL_UNLIKELY((vlSelf->clk & 0xfeU))) {
        Verilated::overWidthError(\"clk\");
    }
}

VL_ATTR_COLD void Vtop___024root___eval_stl(Vtop___024root* vlSelf) {
    // Body
    vlSelf->out = 1U;
}
";

    fn locate(text: &str) -> VriResult<Vec<FunctionBody>> {
        locate_bodies(Path::new("Vtop___024root__0.cpp"), text, &InstrumentConfig::new())
    }

    #[test]
    fn test_locates_categorized_bodies() {
        let bodies = locate(SOURCE).unwrap();
        assert_eq!(bodies.len(), 2);

        assert_eq!(bodies[0].category, BodyCategory::NonBlockingAssign);
        assert_eq!(bodies[0].function, "Vtop___024root___nba_sequent__TOP__0");
        assert_eq!(bodies[0].lines(), 9..13);

        assert_eq!(bodies[1].category, BodyCategory::Settle);
        assert_eq!(bodies[1].lines(), 24..25);
    }

    #[test]
    fn test_body_lines_match_text() {
        let bodies = locate(SOURCE).unwrap();
        let lines: Vec<&str> = SOURCE.lines().collect();
        assert_eq!(lines[bodies[0].start_line].trim(), "vlSelf->count = ((IData)(1U) + vlSelf->count);");
        assert_eq!(lines[bodies[0].end_line], "}");
    }

    #[test]
    fn test_category_priority_and_qualification() {
        assert_eq!(
            BodyCategory::from_function_name("Vtop___024root___act_nba"),
            Some(BodyCategory::NonBlockingAssign)
        );
        assert_eq!(
            BodyCategory::from_function_name("Vtop_interact::eval"),
            None
        );
        assert_eq!(
            BodyCategory::from_function_name("Vtop___024root___eval_act"),
            Some(BodyCategory::Active)
        );
    }

    #[test]
    fn test_prototypes_ignored() {
        let bodies = locate("void Vtop___024root___eval_act(Vtop___024root* vlSelf);\n").unwrap();
        assert!(bodies.is_empty());
    }

    #[test]
    fn test_missing_marker_is_fatal() {
        let err = locate("void f_act() {\n    x = 1;\n}\n").unwrap_err();
        assert!(matches!(err, VriError::MissingBodyMarker { line: 0, .. }));
    }

    #[test]
    fn test_unclosed_body_is_fatal() {
        let err = locate("void f_act() {\n    // Body\n    x = 1;\n  }\n").unwrap_err();
        assert!(matches!(err, VriError::UnclosedBody { .. }));
    }

    #[test]
    fn test_stops_at_marker_include() {
        let text = format!("#include \"coverage.hpp\"\n{SOURCE}");
        assert!(locate(&text).unwrap().is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let text = "void f_nba() {\r\n    // Body\r\n    x = 1;\r\n}\r\n";
        let bodies = locate(text).unwrap();
        assert_eq!(bodies[0].lines(), 2..3);
    }
}
