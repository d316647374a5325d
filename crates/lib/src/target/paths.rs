//! Per-build directory layout.

use std::path::{Path, PathBuf};

use crate::platform::Triplet;
use crate::target::BuildError;

/// Directories a build writes into, derived from the build root and target.
///
/// ```text
/// <build_root>/
///   gvm/          intermediate objects and glue sources
///   gvm/tmp/      compiler scratch space, wiped before each compile
///   <triple>/     final executable
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPaths {
  pub build_root: PathBuf,
  pub intermediate_dir: PathBuf,
  pub scratch_dir: PathBuf,
  pub artifact_dir: PathBuf,
}

impl ProcessPaths {
  pub fn new(build_root: &Path, target: &Triplet) -> Self {
    let intermediate_dir = build_root.join("gvm");
    Self {
      build_root: build_root.to_path_buf(),
      scratch_dir: intermediate_dir.join("tmp"),
      intermediate_dir,
      artifact_dir: build_root.join(target.triple()),
    }
  }

  /// Compute the layout and create every directory in it.
  ///
  /// The build root is made absolute first: stages run with the intermediate
  /// directory as their working directory.
  pub fn create(build_root: &Path, target: &Triplet) -> Result<Self, BuildError> {
    let build_root = std::path::absolute(build_root).map_err(|source| BuildError::Io {
      path: build_root.to_path_buf(),
      source,
    })?;
    let paths = Self::new(&build_root, target);
    for dir in [&paths.intermediate_dir, &paths.scratch_dir, &paths.artifact_dir] {
      std::fs::create_dir_all(dir).map_err(|source| BuildError::Io {
        path: dir.clone(),
        source,
      })?;
    }
    Ok(paths)
  }

  /// Location of the linked executable.
  pub fn app_path(&self, app_name: &str) -> PathBuf {
    self.artifact_dir.join(app_name)
  }
}
