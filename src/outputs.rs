//! Build-output collection
//!
//! After a successful Gradle build the shared libraries sit in
//! version-dependent intermediate directories. This module knows the
//! layouts that successive Android Gradle Plugin generations have used,
//! searches them in order of preference, and copies the first hit per ABI
//! into a clean `output/` tree alongside the generated stub class. An ABI
//! with no artifact is reported, not fatal — partial builds are a
//! downstream concern, not ours.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifacts::LIB_MODULE_DIR;
use crate::config::BuildConfig;
use crate::error::BuildResult;

/// Name of the directory the collected outputs are copied into.
pub const OUTPUT_DIR: &str = "output";

/// Result of one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectReport {
    /// Shared libraries copied, at most one per configured ABI.
    pub libraries_copied: usize,
    /// ABIs for which no library was found in any known layout.
    pub missing_abis: Vec<String>,
}

/// Copy built libraries and the generated stub class into `output/`.
///
/// The output directory is cleared first so it only ever reflects the
/// latest run.
pub fn collect_outputs(project_root: &Path, config: &BuildConfig) -> BuildResult<CollectReport> {
    let output_root = project_root.join(OUTPUT_DIR);
    if output_root.exists() {
        std::fs::remove_dir_all(&output_root)?;
    }
    std::fs::create_dir_all(&output_root)?;

    let so_file = format!("lib{}.so", config.so_name);
    let search_bases = search_bases(project_root);

    let mut libraries_copied = 0;
    let mut missing_abis = Vec::new();
    for abi in &config.abi_filters {
        let found = search_bases
            .iter()
            .map(|base| base.join(abi).join(&so_file))
            .find(|candidate| candidate.exists());
        match found {
            Some(source) => {
                let abi_dir = output_root.join(abi);
                std::fs::create_dir_all(&abi_dir)?;
                std::fs::copy(&source, abi_dir.join(&so_file))?;
                info!(abi = %abi, source = %source.display(), "collected library");
                libraries_copied += 1;
            }
            None => {
                warn!(abi = %abi, file = %so_file, "no library found for ABI");
                missing_abis.push(abi.clone());
            }
        }
    }

    copy_stub_class(project_root, config, &output_root)?;

    Ok(CollectReport {
        libraries_copied,
        missing_abis,
    })
}

/// Intermediate directories to probe, newest plugin layout first.
fn search_bases(project_root: &Path) -> Vec<PathBuf> {
    let intermediates = project_root
        .join(LIB_MODULE_DIR)
        .join("build")
        .join("intermediates");

    let mut bases = vec![
        intermediates.join("stripped_native_libs/release/out/lib"),
        intermediates.join("merged_native_libs/release/out/lib"),
        intermediates.join("cmake/release/obj"),
    ];

    // Plugin versions driving CMake externally leave per-configuration
    // `obj` directories at unpredictable depths under `cxx`.
    let cxx = intermediates.join("cxx");
    if cxx.is_dir() {
        collect_obj_dirs(&cxx, &mut bases);
    }

    bases
}

fn collect_obj_dirs(dir: &Path, bases: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name() == Some(std::ffi::OsStr::new("obj")) {
                bases.push(path);
            } else {
                collect_obj_dirs(&path, bases);
            }
        }
    }
}

fn copy_stub_class(
    project_root: &Path,
    config: &BuildConfig,
    output_root: &Path,
) -> BuildResult<()> {
    let package_path: PathBuf = config.jni_class_package.split('.').collect();
    let stub_name = format!("{}.java", config.jni_class_name);
    let stub_source = project_root
        .join(LIB_MODULE_DIR)
        .join("src/main/java")
        .join(&package_path)
        .join(&stub_name);

    if stub_source.exists() {
        let stub_out_dir = output_root.join("java").join(&package_path);
        std::fs::create_dir_all(&stub_out_dir)?;
        std::fs::copy(&stub_source, stub_out_dir.join(&stub_name))?;
        info!(class = %config.jni_class_name, "collected stub class");
    }
    Ok(())
}
