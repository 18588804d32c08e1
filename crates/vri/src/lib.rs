//! VRI: coverage instrumentation for Verilator-generated C++
//!
//! Rewrites the evaluation functions of a Verilated model so that the
//! simulator reports branch coverage and the number of flip-flop bit toggles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       VRI Pipeline                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   *.h ──► scanner ──► ModuleFieldSet (watch lists)               │
//! │                              │                                   │
//! │   *.cpp ──► locator ──► syntax::parser ──► instrument            │
//! │                                               │                  │
//! │             splice ◄── syntax::printer ◄──────┘                  │
//! │               │                                                  │
//! │   driver: plan every file, then write files, runtime, build list │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vri::{run, InstrumentConfig};
//!
//! let config = InstrumentConfig::new().with_top("Vcore").with_seed(1);
//! let report = run(std::path::Path::new("obj_dir"), &config)?;
//! println!("{} files instrumented", report.instrumented().count());
//! # Ok::<(), vri::VriError>(())
//! ```

#![warn(missing_docs)]

#[allow(clippy::missing_errors_doc)]
pub mod buildlist;
#[allow(clippy::missing_errors_doc)]
pub mod config;
#[allow(clippy::missing_errors_doc)]
pub mod driver;
#[allow(clippy::missing_errors_doc)]
pub mod instrument;
#[allow(clippy::missing_errors_doc)]
pub mod locator;
pub mod result;
#[allow(clippy::missing_errors_doc)]
pub mod retype;
#[allow(clippy::missing_errors_doc)]
pub mod runtime;
#[allow(clippy::missing_errors_doc)]
pub mod scanner;
#[allow(clippy::missing_errors_doc)]
pub mod splice;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod syntax;

/// Runtime header holding the counting storage types; never scanned
pub const RUNTIME_DATA_HEADER: &str = "counting_data.h";

pub use config::InstrumentConfig;
pub use driver::{
    instrument_source, run, scan, FileOutcome, FileReport, InstrumentedSource, RunReport,
};
pub use instrument::{InstrumentStats, Instrumenter};
pub use locator::{locate_bodies, BodyCategory, FunctionBody};
pub use result::{VriError, VriResult};
pub use retype::{retype, RetypeReport};
pub use scanner::{DeclarationScanner, ModuleFieldSet, WatchedField};
