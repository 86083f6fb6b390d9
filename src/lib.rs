//! aes-builder — one-shot generator for an AES key-embedding Android
//! native library project.
//!
//! A single `config.json` describes the key, an obfuscation marker and the
//! exported symbol names; from it the pipeline produces a mutually
//! consistent set of source artifacts (JNI glue, signature-check header,
//! CMake and Gradle build descriptions, Java stub, Kotlin demo activity)
//! that the downstream Gradle/NDK build compiles into a shared library.
//! The plaintext key never appears in any artifact as a contiguous
//! literal.
//!
//! Pipeline order, strictly sequential: validate → derive key sequence →
//! resolve signing fragments → render templates → write artifacts, then
//! optionally build and collect outputs. Everything is recomputed per run;
//! no state survives between invocations.

use std::path::Path;

/// Error taxonomy for the whole pipeline.
pub mod error;

/// Configuration parsing and validation — the gate everything depends on.
pub mod config;

/// Key obfuscation: raw key → per-character buffer init sequence.
pub mod secret;

/// Optional signing feature: the all-or-nothing fragment bundle.
pub mod signing;

/// Template loading and `{{TOKEN}}` substitution.
pub mod render;

/// Artifact rendering, destinations, and persistence policies.
pub mod artifacts;

/// Downstream Gradle invocation.
pub mod gradle;

/// Locating and copying built libraries out of Gradle intermediates.
pub mod outputs;

pub use artifacts::{ArtifactPlan, GeneratedArtifact, WritePolicy};
pub use config::BuildConfig;
pub use error::{BuildError, BuildResult};
pub use render::{TemplateKind, TemplateSet};
pub use secret::KeySpec;
pub use signing::SigningBundle;

/// Render and persist the full artifact set for a validated configuration.
///
/// Returns the plan so callers can report what was written.
pub fn generate_project(
    config: &BuildConfig,
    templates: &TemplateSet,
    project_root: &Path,
    policy: WritePolicy,
) -> BuildResult<ArtifactPlan> {
    let plan = ArtifactPlan::build(config, templates)?;
    plan.write(project_root, policy)?;
    Ok(plan)
}
