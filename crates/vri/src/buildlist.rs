//! Build list patch
//!
//! Verilator lists the compilation units of a model in `<top>_classes.mk`:
//!
//! ```text
//! VM_CLASSES_FAST += \
//!     Vtop \
//!     Vtop___024root__DepSet_h84412442__0 \
//! ```
//!
//! The runtime units are added right after the `VM_CLASSES_FAST` line.

use crate::config::InstrumentConfig;
use crate::result::{VriError, VriResult};
use std::path::{Path, PathBuf};

/// Path of the build list of the configured top module
#[must_use]
pub fn build_list_path(root: &Path, config: &InstrumentConfig) -> PathBuf {
    root.join(config.classes_file())
}

/// Add the runtime units of `config` to build list text
pub fn patch_build_list(path: &Path, text: &str, config: &InstrumentConfig) -> VriResult<String> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let anchor = lines
        .iter()
        .position(|line| line.trim() == config.classes_line)
        .ok_or_else(|| VriError::MissingLine {
            path: path.to_path_buf(),
            line: config.classes_line.clone(),
        })?;
    let newline = if lines[anchor].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };

    let mut out = String::with_capacity(text.len() + 32);
    for (index, line) in lines.iter().enumerate() {
        out.push_str(line);
        if index == anchor {
            if !line.ends_with('\n') {
                out.push_str(newline);
            }
            for class in &config.classes {
                out.push_str(&format!("\t{class} \\{newline}"));
            }
        }
    }
    Ok(out)
}

/// Read and patch the build list below `root` without writing it
pub fn plan_build_list(root: &Path, config: &InstrumentConfig) -> VriResult<(PathBuf, String)> {
    let path = build_list_path(root, config);
    if !path.is_file() {
        return Err(VriError::MissingFile { path });
    }
    let text = std::fs::read_to_string(&path).map_err(VriError::io(&path))?;
    let patched = patch_build_list(&path, &text, config)?;
    Ok((path, patched))
}
