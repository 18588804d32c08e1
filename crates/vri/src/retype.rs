//! Declaration retyping pre-pass
//!
//! An alternative toggle-tracking strategy that works on the headers instead
//! of the function bodies: every watched scalar field is given a counting
//! wrapper type (`IData x;` becomes `CountingIData x;`) whose assignment
//! operator adds the flipped bits to a counter. The wrapper types live in the
//! runtime header `counting_data.h`, included right before `verilated.h`.

use crate::config::InstrumentConfig;
use crate::result::{VriError, VriResult};
use crate::runtime::{self, COUNTING_DATA};
use crate::scanner::{declaration_files, DeclarationKind, DeclarationScanner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix turning a storage type into its counting wrapper
pub const COUNTING_PREFIX: &str = "Counting";

const VERILATED_INCLUDE: &str = "#include \"verilated.h\"";
const THREADS_INCLUDE: &str = "#include \"verilated_threads.h\"";
const THREADED_MACRO: &str = "__COUNTING_IS_THREADED";

/// A planned header rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetypedHeader {
    /// Header file
    pub path: PathBuf,
    /// New contents
    pub text: String,
    /// Number of retyped declarations
    pub fields: usize,
    /// Whether the model uses Verilator threads
    pub threaded: bool,
}

/// Outcome of a retyping run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetypeReport {
    /// Rewritten headers
    pub headers: Vec<PathBuf>,
    /// Retyped declarations across all headers
    pub fields: usize,
    /// Runtime files written
    pub runtime_files: Vec<PathBuf>,
}

/// Retype the watched scalar declarations of one header
///
/// Returns `None` when nothing in the header needs a counting type.
pub fn retype_header(
    path: &Path,
    text: &str,
    config: &InstrumentConfig,
) -> VriResult<Option<RetypedHeader>> {
    let scanner = DeclarationScanner::new(config);
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let threaded = lines.iter().any(|line| line.trim() == THREADS_INCLUDE);

    let mut retyped: Vec<String> = Vec::with_capacity(lines.len() + 3);
    let mut fields = 0;
    for (line_no, line) in lines.iter().enumerate() {
        let declaration = scanner.scan_line(line_no, line).map_err(|err| match err {
            VriError::MalformedDeclaration { line, reason, text } => {
                VriError::MalformedDeclaration {
                    line,
                    reason: format!("{reason} (in '{}')", path.display()),
                    text,
                }
            }
            other => other,
        })?;
        match declaration {
            Some(declaration) if matches!(declaration.kind, DeclarationKind::Scalar(_)) => {
                let indent = line.len() - line.trim_start().len();
                retyped.push(format!("{}{COUNTING_PREFIX}{}", &line[..indent], &line[indent..]));
                fields += 1;
            }
            _ => retyped.push((*line).to_string()),
        }
    }
    if fields == 0 {
        return Ok(None);
    }

    let anchor = lines
        .iter()
        .position(|line| line.trim() == VERILATED_INCLUDE)
        .ok_or_else(|| VriError::MissingLine {
            path: path.to_path_buf(),
            line: VERILATED_INCLUDE.to_string(),
        })?;
    let newline = if lines[anchor].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };
    let guard = [
        format!("#define {THREADED_MACRO} {}{newline}", u8::from(threaded)),
        format!("#include \"{}\"{newline}", COUNTING_DATA.name),
        format!("#undef {THREADED_MACRO}{newline}"),
    ];
    retyped.splice(anchor..anchor, guard);

    debug!(path = %path.display(), fields, threaded, "retyped header");
    Ok(Some(RetypedHeader {
        path: path.to_path_buf(),
        text: retyped.concat(),
        fields,
        threaded,
    }))
}

/// Plan the rewrite of every header below `root` without writing anything
pub fn plan_retype(root: &Path, config: &InstrumentConfig) -> VriResult<Vec<RetypedHeader>> {
    if !root.is_dir() {
        return Err(VriError::MissingDirectory {
            path: root.to_path_buf(),
        });
    }
    let mut planned = Vec::new();
    for path in declaration_files(root)? {
        let text = std::fs::read_to_string(&path).map_err(VriError::io(&path))?;
        if let Some(header) = retype_header(&path, &text, config)? {
            planned.push(header);
        }
    }
    Ok(planned)
}

/// Retype every header below `root` and copy the counting types next to them
pub fn retype(root: &Path, config: &InstrumentConfig) -> VriResult<RetypeReport> {
    let planned = plan_retype(root, config)?;
    let mut report = RetypeReport::default();
    for header in planned {
        std::fs::write(&header.path, &header.text).map_err(VriError::io(&header.path))?;
        info!(path = %header.path.display(), fields = header.fields, "retyped");
        report.fields += header.fields;
        report.headers.push(header.path);
    }
    report.runtime_files = runtime::write_assets(root, &[COUNTING_DATA])?;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "\
#ifndef VERILATED_VTOP___024ROOT_H_
#define VERILATED_VTOP___024ROOT_H_

#include \"verilated.h\"

class Vtop___024root final : public VerilatedModule {
  public:
    VL_IN8(clk,0,0);
    CData/*0:0*/ __Vtrigprevexpr___TOP__clk__0;
    IData/*31:0*/ count;
    VlUnpacked<CData/*7:0*/, 16> mem;
};
#endif
";

    fn retype_text(text: &str) -> Option<RetypedHeader> {
        retype_header(Path::new("Vtop___024root.h"), text, &InstrumentConfig::new()).unwrap()
    }

    #[test]
    fn test_scalar_fields_retyped_with_guard() {
        let header = retype_text(HEADER).unwrap();
        assert_eq!(header.fields, 1);
        assert!(!header.threaded);
        assert_eq!(
            header.text,
            "\
#ifndef VERILATED_VTOP___024ROOT_H_
#define VERILATED_VTOP___024ROOT_H_

#define __COUNTING_IS_THREADED 0
#include \"counting_data.h\"
#undef __COUNTING_IS_THREADED
#include \"verilated.h\"

class Vtop___024root final : public VerilatedModule {
  public:
    VL_IN8(clk,0,0);
    CData/*0:0*/ __Vtrigprevexpr___TOP__clk__0;
    CountingIData/*31:0*/ count;
    VlUnpacked<CData/*7:0*/, 16> mem;
};
#endif
"
        );
    }

    #[test]
    fn test_threaded_models_detected() {
        let text = HEADER.replace(
            "#include \"verilated.h\"\n",
            "#include \"verilated.h\"\n#include \"verilated_threads.h\"\n",
        );
        let header = retype_text(&text).unwrap();
        assert!(header.threaded);
        assert!(header.text.contains("#define __COUNTING_IS_THREADED 1\n"));
    }

    #[test]
    fn test_retype_is_idempotent() {
        let once = retype_text(HEADER).unwrap();
        assert_eq!(retype_text(&once.text), None);
    }

    #[test]
    fn test_missing_verilated_include() {
        let text = HEADER.replace("#include \"verilated.h\"\n", "");
        let err = retype_header(Path::new("Vtop___024root.h"), &text, &InstrumentConfig::new())
            .unwrap_err();
        assert!(matches!(err, VriError::MissingLine { .. }));
    }

    #[test]
    fn test_retype_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Vtop___024root.h"), HEADER).unwrap();
        std::fs::write(dir.path().join("Vtop.h"), "#include \"verilated.h\"\nclass Vtop;\n").unwrap();

        let report = retype(dir.path(), &InstrumentConfig::new()).unwrap();
        assert_eq!(report.headers, vec![dir.path().join("Vtop___024root.h")]);
        assert_eq!(report.fields, 1);
        assert!(dir.path().join("counting_data.h").is_file());

        // The copied runtime header is never scanned on a second pass.
        let again = retype(dir.path(), &InstrumentConfig::new()).unwrap();
        assert!(again.headers.is_empty());
    }
}
