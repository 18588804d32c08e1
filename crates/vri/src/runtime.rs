//! Runtime support sources
//!
//! The C++ runtime the instrumented code links against ships inside the
//! library and is copied next to the generated sources.

use crate::result::{VriError, VriResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// A runtime source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeAsset {
    /// File name inside the instrumented directory
    pub name: &'static str,
    /// File contents
    pub contents: &'static str,
}

/// Coverage map declaration; its presence marks a directory as instrumented
pub const COVERAGE_HEADER: RuntimeAsset = RuntimeAsset {
    name: "coverage.hpp",
    contents: include_str!("../runtime/coverage.hpp"),
};

/// Files copied by `instrument`
pub const INSTRUMENT_ASSETS: [RuntimeAsset; 4] = [
    COVERAGE_HEADER,
    RuntimeAsset {
        name: "coverage.cpp",
        contents: include_str!("../runtime/coverage.cpp"),
    },
    RuntimeAsset {
        name: "counting.hpp",
        contents: include_str!("../runtime/counting.hpp"),
    },
    RuntimeAsset {
        name: "counting.cpp",
        contents: include_str!("../runtime/counting.cpp"),
    },
];

/// Counting storage types copied by `retype`
pub const COUNTING_DATA: RuntimeAsset = RuntimeAsset {
    name: crate::RUNTIME_DATA_HEADER,
    contents: include_str!("../runtime/counting_data.h"),
};

/// Path of the already-instrumented marker below `root`
#[must_use]
pub fn marker_path(root: &Path) -> PathBuf {
    root.join(COVERAGE_HEADER.name)
}

/// Write `assets` into `root`, returning the written paths
pub fn write_assets(root: &Path, assets: &[RuntimeAsset]) -> VriResult<Vec<PathBuf>> {
    assets
        .iter()
        .map(|asset| {
            let path = root.join(asset.name);
            std::fs::write(&path, asset.contents).map_err(VriError::io(&path))?;
            info!(path = %path.display(), "wrote runtime file");
            Ok(path)
        })
        .collect()
}
