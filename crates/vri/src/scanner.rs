//! Declaration scanner
//!
//! Reads Verilator-generated module headers line by line and collects the
//! names of the state fields whose assignments are toggle-counted.
//!
//! Two declaration shapes are recognized:
//!
//! ```text
//! IData/*31:0*/ counter;                    // scalar storage cell
//! VlUnpacked<VlUnpacked<CData, 4>, 8> mem;  // unpacked array template
//! ```
//!
//! Names starting with `__` are Verilator internals and never watched.

use crate::config::InstrumentConfig;
use crate::result::{VriError, VriResult};
use crate::RUNTIME_DATA_HEADER;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of declaration files
pub const DECLARATION_EXTENSION: &str = "h";

/// A field eligible for toggle tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WatchedField {
    /// Module (header base name) declaring the field
    pub owner_module: String,
    /// Declared field text
    pub name: String,
}

/// How a watched field was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// One of the scalar storage types, by index into the configured list
    Scalar(usize),
    /// The unpacked array template
    Array,
}

/// A recognized declaration line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Shape of the declaration
    pub kind: DeclarationKind,
    /// Declared field text
    pub name: String,
}

/// Watched field names of every scanned module
///
/// Built once before any implementation file is touched and read-only
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModuleFieldSet {
    modules: BTreeMap<String, Vec<String>>,
}

impl ModuleFieldSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the fields of one declaration file
    pub fn insert(&mut self, module: impl Into<String>, fields: Vec<String>) {
        self.modules.entry(module.into()).or_default().extend(fields);
    }

    /// Fields of a module, in declaration order
    #[must_use]
    pub fn fields(&self, module: &str) -> &[String] {
        self.modules.get(module).map_or(&[], Vec::as_slice)
    }

    /// Whether `name` is watched in `module`
    #[must_use]
    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.fields(module).iter().any(|field| field == name)
    }

    /// Number of scanned modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module was scanned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Every watched field of every module
    pub fn watched_fields(&self) -> impl Iterator<Item = WatchedField> + '_ {
        self.modules.iter().flat_map(|(module, fields)| {
            fields.iter().map(move |name| WatchedField {
                owner_module: module.clone(),
                name: name.clone(),
            })
        })
    }

    /// Module an implementation file belongs to
    ///
    /// Verilator names implementation files after their module followed by
    /// `__`-separated suffixes (`Vtop___024root__DepSet_h1__0`), so the
    /// longest module name that is the whole stem or a `__` prefix of it wins.
    #[must_use]
    pub fn module_for_source(&self, stem: &str) -> Option<&str> {
        self.modules
            .keys()
            .filter(|module| {
                stem.strip_prefix(module.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with("__"))
            })
            .max_by_key(|module| module.len())
            .map(String::as_str)
    }
}

/// Base name of a declaration file with its extension removed
pub fn module_name(path: &Path) -> VriResult<String> {
    let extension = path.extension().and_then(|e| e.to_str());
    if extension != Some(DECLARATION_EXTENSION) {
        return Err(VriError::UnknownExtension {
            path: path.to_path_buf(),
            extension: extension.map(String::from),
        });
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
        .ok_or_else(|| VriError::UnknownExtension {
            path: path.to_path_buf(),
            extension: None,
        })
}

/// Scanner for generated declaration files
#[derive(Debug, Clone, Copy)]
pub struct DeclarationScanner<'a> {
    config: &'a InstrumentConfig,
}

impl<'a> DeclarationScanner<'a> {
    /// Create a scanner using the type keywords of `config`
    #[must_use]
    pub const fn new(config: &'a InstrumentConfig) -> Self {
        Self { config }
    }

    /// Recognize a single line; `line_no` is only used for diagnostics
    pub fn scan_line(&self, line_no: usize, line: &str) -> VriResult<Option<Declaration>> {
        let stripped = line.trim_start();
        let malformed = |reason: &str| VriError::MalformedDeclaration {
            line: line_no,
            reason: reason.to_string(),
            text: line.trim_end().to_string(),
        };

        for (index, keyword) in self.config.scalar_types.iter().enumerate() {
            let Some(rest) = strip_keyword(stripped, keyword) else {
                continue;
            };
            let mut rest = rest.trim_start();
            if let Some(comment) = rest.strip_prefix("/*") {
                let end = comment
                    .find("*/")
                    .ok_or_else(|| malformed("unterminated inline comment"))?;
                rest = comment[end + 2..].trim_start();
            }
            return Ok(declared_name(rest).map(|name| Declaration {
                kind: DeclarationKind::Scalar(index),
                name,
            }));
        }

        let Some(rest) = strip_keyword(stripped, &self.config.array_template) else {
            return Ok(None);
        };
        let rest = rest.trim_start();
        if !rest.starts_with('<') {
            return Err(malformed("expected '<' after array template"));
        }
        let mut depth = 0usize;
        for (offset, ch) in rest.char_indices() {
            match ch {
                '<' => depth += 1,
                '>' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(declared_name(&rest[offset + 1..]).map(|name| Declaration {
                            kind: DeclarationKind::Array,
                            name,
                        }));
                    }
                }
                _ => {}
            }
        }
        Err(malformed("template arguments never close"))
    }

    /// Watched field names declared in `source`, in order
    pub fn scan_source(&self, source: &str) -> VriResult<Vec<String>> {
        let mut fields = Vec::new();
        for (line_no, line) in source.lines().enumerate() {
            if let Some(declaration) = self.scan_line(line_no, line)? {
                fields.push(declaration.name);
            }
        }
        Ok(fields)
    }

    /// Scan one declaration file, returning its module name and fields
    pub fn scan_file(&self, path: &Path) -> VriResult<(String, Vec<String>)> {
        let module = module_name(path)?;
        let source = std::fs::read_to_string(path).map_err(VriError::io(path))?;
        let fields = self.scan_source(&source).map_err(|err| match err {
            VriError::MalformedDeclaration { line, reason, text } => {
                VriError::MalformedDeclaration {
                    line,
                    reason: format!("{reason} (in '{}')", path.display()),
                    text,
                }
            }
            other => other,
        })?;
        debug!(module = %module, fields = fields.len(), "scanned declarations");
        Ok((module, fields))
    }

    /// Scan every declaration file below `root`
    pub fn scan_directory(&self, root: &Path) -> VriResult<ModuleFieldSet> {
        let mut set = ModuleFieldSet::new();
        for path in declaration_files(root)? {
            let (module, fields) = self.scan_file(&path)?;
            set.insert(module, fields);
        }
        Ok(set)
    }
}

/// Declaration files below `root`, sorted, excluding the runtime header
pub fn declaration_files(root: &Path) -> VriResult<Vec<PathBuf>> {
    let pattern = root.join("**").join(format!("*.{DECLARATION_EXTENSION}"));
    let mut files = glob::glob(&pattern.to_string_lossy())?.collect::<Result<Vec<_>, _>>()?;
    files.retain(|path| {
        path.is_file() && path.file_name().and_then(|n| n.to_str()) != Some(RUNTIME_DATA_HEADER)
    });
    files.sort();
    Ok(files)
}

fn strip_keyword<'l>(line: &'l str, keyword: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

fn declared_name(rest: &str) -> Option<String> {
    let end = rest.find(';')?;
    let name = rest[..end].trim();
    if name.is_empty() || name.starts_with("__") {
        return None;
    }
    Some(name.to_string())
}
