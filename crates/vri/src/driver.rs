//! Instrumentation driver
//!
//! A run goes through two phases. Planning reads every input and computes
//! every output in memory: declarations are scanned first, then each
//! implementation file is located, parsed, instrumented, regenerated and
//! spliced. Committing writes the planned files, the runtime sources and the
//! patched build list. Any error during planning leaves the directory exactly
//! as it was.

use crate::buildlist::plan_build_list;
use crate::config::InstrumentConfig;
use crate::instrument::{InstrumentStats, Instrumenter};
use crate::locator::{locate_bodies, FunctionBody};
use crate::result::{VriError, VriResult};
use crate::runtime::{self, INSTRUMENT_ASSETS};
use crate::scanner::{DeclarationScanner, ModuleFieldSet};
use crate::splice::{splice, Replacement};
use crate::syntax::{parse_snippet, print_statements};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension of implementation files
pub const IMPLEMENTATION_EXTENSION: &str = "cpp";

/// What happened to one implementation file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// At least one body was rewritten
    Instrumented {
        /// Rewritten bodies
        bodies: usize,
        /// Injected operations
        stats: InstrumentStats,
    },
    /// No eligible body; the file is untouched
    Skipped,
}

/// Per-file entry of a [`RunReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Implementation file
    pub path: PathBuf,
    /// Module whose fields were watched, if one matched
    pub module: Option<String>,
    /// Outcome
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summary of an instrumentation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Instrumented directory
    pub root: PathBuf,
    /// Number of scanned modules
    pub modules: usize,
    /// Number of watched fields across modules
    pub watched_fields: usize,
    /// Every implementation file, sorted by path
    pub files: Vec<FileReport>,
    /// Runtime sources written
    pub runtime_files: Vec<PathBuf>,
    /// Patched build list
    pub build_list: PathBuf,
    /// Totals over all files
    pub totals: InstrumentStats,
}

impl RunReport {
    /// Files that were rewritten
    pub fn instrumented(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Instrumented { .. }))
    }

    /// Files that were left untouched
    pub fn skipped(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| file.outcome == FileOutcome::Skipped)
    }
}

/// Result of instrumenting the text of one implementation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedSource {
    /// New file contents
    pub text: String,
    /// Rewritten bodies
    pub bodies: Vec<FunctionBody>,
    /// Injected operations
    pub stats: InstrumentStats,
}

struct PlannedFile {
    report: FileReport,
    text: Option<String>,
}

/// Instrument one implementation file's text
///
/// Returns `None` when the file has no eligible body.
pub fn instrument_source(
    path: &Path,
    text: &str,
    watched: &[String],
    config: &InstrumentConfig,
    rng: &mut dyn RngCore,
) -> VriResult<Option<InstrumentedSource>> {
    let bodies = locate_bodies(path, text, config)?;
    if bodies.is_empty() {
        return Ok(None);
    }

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut instrumenter = Instrumenter::new(config, watched, rng);
    let mut replacements = Vec::with_capacity(bodies.len());
    for body in &bodies {
        let snippet = lines[body.lines()].concat();
        let mut stmts = parse_snippet(&snippet).map_err(|err| match err {
            VriError::Syntax { offset, message } => VriError::Parse {
                path: path.to_path_buf(),
                start: body.start_line,
                end: body.end_line,
                message: format!("{message} (offset {offset})"),
                snippet: snippet.clone(),
            },
            other => other,
        })?;
        instrumenter
            .instrument_block(&mut stmts)
            .map_err(|err| match err {
                VriError::Unsupported { kind, fragment } => VriError::UnsupportedInBody {
                    path: path.to_path_buf(),
                    start: body.start_line,
                    end: body.end_line,
                    kind,
                    fragment,
                },
                other => other,
            })?;
        replacements.push(Replacement::new(body.lines(), print_statements(&stmts, 1)));
    }

    let text = splice(path, text, &replacements, &config.includes)?;
    Ok(Some(InstrumentedSource {
        text,
        bodies,
        stats: instrumenter.stats(),
    }))
}

/// Implementation files below `root`, sorted
pub fn implementation_files(root: &Path) -> VriResult<Vec<PathBuf>> {
    let pattern = root.join("**").join(format!("*.{IMPLEMENTATION_EXTENSION}"));
    let mut files = glob::glob(&pattern.to_string_lossy())?.collect::<Result<Vec<_>, _>>()?;
    files.retain(|path| path.is_file());
    files.sort();
    Ok(files)
}

/// Scan the declarations below `root` without modifying anything
pub fn scan(root: &Path, config: &InstrumentConfig) -> VriResult<ModuleFieldSet> {
    ensure_directory(root)?;
    DeclarationScanner::new(config).scan_directory(root)
}

/// Random source for coverage point identifiers
#[must_use]
pub fn coverage_rng(config: &InstrumentConfig) -> StdRng {
    config
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

/// Instrument the Verilator output tree at `root`
pub fn run(root: &Path, config: &InstrumentConfig) -> VriResult<RunReport> {
    ensure_directory(root)?;
    config.validate()?;

    let marker = runtime::marker_path(root);
    if marker.exists() {
        return Err(VriError::AlreadyInstrumented {
            root: root.to_path_buf(),
            marker,
        });
    }
    let (build_list, build_list_text) = plan_build_list(root, config)?;

    let fields = DeclarationScanner::new(config).scan_directory(root)?;
    info!(
        modules = fields.len(),
        watched = fields.watched_fields().count(),
        "scanned declarations"
    );
    if fields.is_empty() {
        warn!(root = %root.display(), "no declaration files found");
    }

    let mut rng = coverage_rng(config);
    let planned = implementation_files(root)?
        .into_iter()
        .map(|path| plan_file(&path, &fields, config, &mut rng))
        .collect::<VriResult<Vec<_>>>()?;

    let mut totals = InstrumentStats::default();
    let mut files = Vec::with_capacity(planned.len());
    for file in planned {
        if let Some(text) = &file.text {
            std::fs::write(&file.report.path, text).map_err(VriError::io(&file.report.path))?;
        }
        if let FileOutcome::Instrumented { stats, .. } = file.report.outcome {
            totals.merge(stats);
        }
        files.push(file.report);
    }
    let runtime_files = runtime::write_assets(root, &INSTRUMENT_ASSETS)?;
    std::fs::write(&build_list, build_list_text).map_err(VriError::io(&build_list))?;
    info!(path = %build_list.display(), "patched build list");

    Ok(RunReport {
        root: root.to_path_buf(),
        modules: fields.len(),
        watched_fields: fields.watched_fields().count(),
        files,
        runtime_files,
        build_list,
        totals,
    })
}

fn plan_file(
    path: &Path,
    fields: &ModuleFieldSet,
    config: &InstrumentConfig,
    rng: &mut dyn RngCore,
) -> VriResult<PlannedFile> {
    let text = std::fs::read_to_string(path).map_err(VriError::io(path))?;
    let module = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| fields.module_for_source(stem))
        .map(String::from);
    let watched = module.as_deref().map_or(&[][..], |module| fields.fields(module));

    let planned = match instrument_source(path, &text, watched, config, rng)? {
        Some(source) => {
            info!(
                path = %path.display(),
                bodies = source.bodies.len(),
                coverage_points = source.stats.coverage_points,
                toggle_counters = source.stats.toggle_counters,
                "instrumented"
            );
            PlannedFile {
                report: FileReport {
                    path: path.to_path_buf(),
                    module,
                    outcome: FileOutcome::Instrumented {
                        bodies: source.bodies.len(),
                        stats: source.stats,
                    },
                },
                text: Some(source.text),
            }
        }
        None => {
            info!(path = %path.display(), "skipped, no eligible body");
            PlannedFile {
                report: FileReport {
                    path: path.to_path_buf(),
                    module,
                    outcome: FileOutcome::Skipped,
                },
                text: None,
            }
        }
    };
    Ok(planned)
}

fn ensure_directory(root: &Path) -> VriResult<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(VriError::MissingDirectory {
            path: root.to_path_buf(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SOURCE: &str = "#include \"Vtop.h\"\n\nvoid Vtop___024root___eval_act(Vtop___024root* vlSelf) {\n    // Body\n    if (vlSelf->a) {\n        vlSelf->q = 1U;\n    }\n}\n";

    #[test]
    fn test_instrument_source_counts() {
        let config = InstrumentConfig::new();
        let mut rng = StdRng::seed_from_u64(0);
        let watched = vec!["q".to_string()];
        let source = instrument_source(Path::new("Vtop.cpp"), SOURCE, &watched, &config, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(source.bodies.len(), 1);
        assert_eq!(
            source.stats,
            InstrumentStats {
                coverage_points: 2,
                toggle_counters: 1,
            }
        );
        assert!(source.text.starts_with("#include \"coverage.hpp\"\n#include \"counting.hpp\"\n#include \"Vtop.h\"\n"));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = InstrumentConfig::new().with_seed(11);
        let render = || {
            let mut rng = coverage_rng(&config);
            instrument_source(Path::new("Vtop.cpp"), SOURCE, &[], &config, &mut rng)
                .unwrap()
                .unwrap()
                .text
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_parse_errors_carry_location() {
        let config = InstrumentConfig::new();
        let mut rng = StdRng::seed_from_u64(0);
        let text = SOURCE.replace("vlSelf->q = 1U;", "vlSelf->q = ;");
        let err = instrument_source(Path::new("Vtop.cpp"), &text, &[], &config, &mut rng)
            .unwrap_err();
        match err {
            VriError::Parse {
                start, end, snippet, ..
            } => {
                assert_eq!((start, end), (4, 7));
                assert!(snippet.contains("vlSelf->q = ;"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_file_without_bodies_is_none() {
        let config = InstrumentConfig::new();
        let mut rng = StdRng::seed_from_u64(0);
        let out = instrument_source(
            Path::new("Vtop__Syms.cpp"),
            "#include \"Vtop.h\"\nVtop__Syms::Vtop__Syms() {}\n",
            &[],
            &config,
            &mut rng,
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_run_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("missing"), &InstrumentConfig::new()).unwrap_err();
        assert!(matches!(err, VriError::MissingDirectory { .. }));
    }

    #[test]
    fn test_run_requires_build_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Vtop.cpp"), SOURCE).unwrap();
        let err = run(dir.path(), &InstrumentConfig::new()).unwrap_err();
        assert!(matches!(err, VriError::MissingFile { .. }));
        assert_eq!(std::fs::read_to_string(dir.path().join("Vtop.cpp")).unwrap(), SOURCE);
    }

    #[test]
    fn test_unsupported_errors_carry_location() {
        let config = InstrumentConfig::new();
        let mut rng = StdRng::seed_from_u64(0);
        let text = SOURCE.replace(
            "if (vlSelf->a) {\n        vlSelf->q = 1U;\n    }",
            "switch (vlSelf->a) {\n    default: break;\n    }",
        );
        let err = instrument_source(Path::new("Vtop.cpp"), &text, &[], &config, &mut rng)
            .unwrap_err();
        assert!(err.to_string().contains("Vtop.cpp:5-7"));
        match err {
            VriError::UnsupportedInBody {
                path,
                start,
                end,
                kind,
                ..
            } => {
                assert_eq!(path, Path::new("Vtop.cpp"));
                assert_eq!((start, end), (4, 7));
                assert_eq!(kind, "switch statement");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_fails_listing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Vtop.cpp"), SOURCE).unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("Vsub.cpp"), SOURCE).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Permission bits do not bind a privileged user
        let enforced = std::fs::read_dir(&locked).is_err();
        let result = implementation_files(dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if enforced {
            assert!(matches!(result.unwrap_err(), VriError::Io { .. }));
        } else {
            assert_eq!(result.unwrap().len(), 2);
        }
    }
}
