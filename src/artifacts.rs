//! Artifact assembly and persistence
//!
//! Renders every generated file for a validated configuration and writes
//! the set to the project tree. Rendering is pure — the plan is a function
//! of the configuration and template set alone, so two runs over the same
//! inputs produce byte-identical artifacts.
//!
//! Writing has two policies. `Direct` mirrors the historical behavior:
//! files land one at a time and a failure partway leaves the earlier
//! artifacts of the same run on disk. `Staged` renders everything into a
//! temporary directory under the project root and only then moves the set
//! into place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{ArtifactError, BuildResult};
use crate::render::{TemplateKind, TemplateSet};
use crate::secret::KeySpec;
use crate::signing::SigningBundle;

/// Relative path of the library module inside the project tree.
pub const LIB_MODULE_DIR: &str = "lib_module";

/// Relative path of the demo application module.
pub const APP_MODULE_DIR: &str = "app";

/// How [`ArtifactPlan::write`] persists the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Write each artifact in order, directly at its destination.
    #[default]
    Direct,
    /// Render the whole set into a temporary directory first, then move
    /// every file into place.
    Staged,
}

/// One rendered file, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Destination path relative to the project root.
    pub relative_path: PathBuf,
    /// Final text, ready to write.
    pub contents: String,
    /// Delete and recreate the parent directory before writing, so stale
    /// files from a previous configuration cannot linger next to this one.
    pub clear_parent: bool,
}

/// The complete artifact set for one run, in write order.
#[derive(Debug, Clone)]
pub struct ArtifactPlan {
    pub artifacts: Vec<GeneratedArtifact>,
}

impl ArtifactPlan {
    /// Render every artifact for `config` using `templates`.
    pub fn build(config: &BuildConfig, templates: &TemplateSet) -> BuildResult<Self> {
        let key_spec = KeySpec::derive(&config.aes_key, config.interference_char);
        let bundle = SigningBundle::resolve(config);
        debug!(
            signing = bundle.is_enabled(),
            array_size = key_spec.array_size,
            "rendering artifact set"
        );

        let mut artifacts = Vec::with_capacity(TemplateKind::ALL.len());
        for kind in TemplateKind::ALL {
            let substitutions = substitutions_for(kind, config, &key_spec, &bundle);
            let contents = templates.render(kind, &substitutions)?;
            let (relative_path, clear_parent) = destination(kind, config);
            artifacts.push(GeneratedArtifact {
                relative_path,
                contents,
                clear_parent,
            });
        }

        Ok(Self { artifacts })
    }

    /// Persist the set under `root` according to `policy`.
    pub fn write(&self, root: &Path, policy: WritePolicy) -> BuildResult<()> {
        match policy {
            WritePolicy::Direct => self.write_direct(root),
            WritePolicy::Staged => self.write_staged(root),
        }
    }

    fn write_direct(&self, root: &Path) -> BuildResult<()> {
        for artifact in &self.artifacts {
            let destination = root.join(&artifact.relative_path);
            prepare_parent(&destination, artifact.clear_parent)?;
            std::fs::write(&destination, &artifact.contents).map_err(|source| {
                ArtifactError::Write {
                    path: destination.display().to_string(),
                    source,
                }
            })?;
            info!(path = %artifact.relative_path.display(), "wrote artifact");
        }
        Ok(())
    }

    fn write_staged(&self, root: &Path) -> BuildResult<()> {
        std::fs::create_dir_all(root)?;
        let staging = tempfile::tempdir_in(root)?;

        for artifact in &self.artifacts {
            let staged = staging.path().join(&artifact.relative_path);
            prepare_parent(&staged, false)?;
            std::fs::write(&staged, &artifact.contents).map_err(|source| {
                ArtifactError::Write {
                    path: staged.display().to_string(),
                    source,
                }
            })?;
        }

        // Every artifact rendered and staged; move the set into place.
        for artifact in &self.artifacts {
            let staged = staging.path().join(&artifact.relative_path);
            let destination = root.join(&artifact.relative_path);
            prepare_parent(&destination, artifact.clear_parent)?;
            std::fs::rename(&staged, &destination).map_err(|source| {
                ArtifactError::Commit {
                    path: destination.display().to_string(),
                    source,
                }
            })?;
            info!(path = %artifact.relative_path.display(), "committed artifact");
        }
        Ok(())
    }
}

fn prepare_parent(destination: &Path, clear: bool) -> Result<(), ArtifactError> {
    let Some(parent) = destination.parent() else {
        return Ok(());
    };
    let context = |source| ArtifactError::PrepareDir {
        path: parent.display().to_string(),
        source,
    };
    if clear && parent.exists() {
        std::fs::remove_dir_all(parent).map_err(context)?;
    }
    std::fs::create_dir_all(parent).map_err(context)?;
    Ok(())
}

/// Destination path (relative to the project root) and whether its parent
/// directory is cleared first.
fn destination(kind: TemplateKind, config: &BuildConfig) -> (PathBuf, bool) {
    match kind {
        TemplateKind::SignatureHeader => (
            [LIB_MODULE_DIR, "src", "main", "cpp", "checksignature.h"]
                .iter()
                .collect(),
            false,
        ),
        TemplateKind::JniSource => (
            [LIB_MODULE_DIR, "src", "main", "cpp", "JNIEncrypt.c"]
                .iter()
                .collect(),
            false,
        ),
        TemplateKind::CmakeLists => ([LIB_MODULE_DIR, "CMakeLists.txt"].iter().collect(), false),
        TemplateKind::GradleModule => {
            ([LIB_MODULE_DIR, "build.gradle.kts"].iter().collect(), false)
        }
        TemplateKind::JavaStub => {
            let mut path: PathBuf = [LIB_MODULE_DIR, "src", "main", "java"].iter().collect();
            for segment in config.jni_class_package.split('.') {
                path.push(segment);
            }
            path.push(format!("{}.java", config.jni_class_name));
            // The package directory is wiped so a stub generated for a
            // previous class name cannot survive a re-run.
            (path, true)
        }
        TemplateKind::DemoActivity => {
            let mut path: PathBuf = [APP_MODULE_DIR, "src", "main", "kotlin"].iter().collect();
            for segment in config.package_name.split('.') {
                path.push(segment);
            }
            path.push("MainActivity.kt");
            (path, false)
        }
    }
}

fn substitutions_for(
    kind: TemplateKind,
    config: &BuildConfig,
    key_spec: &KeySpec,
    bundle: &SigningBundle,
) -> HashMap<&'static str, String> {
    match kind {
        TemplateKind::SignatureHeader => HashMap::from([
            ("PACKAGE_NAME", config.package_name.clone()),
            ("SIGNATURE_HASH", config.signature_hash.to_string()),
        ]),
        TemplateKind::JniSource => HashMap::from([
            ("JNI_CLASS_PATH", config.jni_class_path()),
            ("KEY_ARRAY_SIZE", key_spec.array_size.to_string()),
            ("KEY_CHAR_LINES", key_spec.init_block()),
            ("METHOD_ENCODE", config.method_encode.clone()),
            ("METHOD_DECODE", config.method_decode.clone()),
            ("METHOD_CHECK", config.method_check.clone()),
            ("SIGN_NATIVE_SOURCE", bundle.native_source.clone()),
            ("SIGN_METHOD_TABLE_ENTRY", bundle.method_table_entry.clone()),
        ]),
        TemplateKind::CmakeLists => HashMap::from([
            ("SO_NAME", config.so_name.clone()),
            ("SIGN_BUILD_SOURCES", bundle.cmake_sources.clone()),
        ]),
        TemplateKind::GradleModule => {
            let quoted: Vec<String> = config
                .abi_filters
                .iter()
                .map(|abi| format!("\"{abi}\""))
                .collect();
            HashMap::from([("ABI_FILTERS", quoted.join(", "))])
        }
        TemplateKind::JavaStub => HashMap::from([
            ("PACKAGE", config.jni_class_package.clone()),
            ("CLASS_NAME", config.jni_class_name.clone()),
            ("SO_NAME", config.so_name.clone()),
            ("METHOD_ENCODE", config.method_encode.clone()),
            ("METHOD_DECODE", config.method_decode.clone()),
            ("METHOD_CHECK", config.method_check.clone()),
            ("SIGN_NATIVE_DECLARATION", bundle.java_declaration.clone()),
        ]),
        TemplateKind::DemoActivity => HashMap::from([
            ("APP_PACKAGE", config.package_name.clone()),
            ("STUB_PACKAGE", config.jni_class_package.clone()),
            ("CLASS_NAME", config.jni_class_name.clone()),
            ("METHOD_ENCODE", config.method_encode.clone()),
            ("METHOD_DECODE", config.method_decode.clone()),
            ("METHOD_CHECK", config.method_check.clone()),
            ("SIGN_UI_HOOK", bundle.ui_hook.clone()),
        ]),
    }
}
