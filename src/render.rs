//! Template loading and placeholder substitution
//!
//! Templates are opaque text blobs owned by the `templates/` directory;
//! this module only knows their names, destinations and token
//! vocabularies. Tokens have the fixed form `{{NAME}}` — the brace
//! delimiters guarantee no complete token is a substring of another, so
//! sequential literal replacement cannot corrupt an already-substituted
//! value.
//!
//! Substitution is literal: no loops, no conditionals, no escaping. The
//! vocabulary table below is the compatibility contract with the template
//! set, and rendering verifies it in both directions — a required token
//! without a bound value and a template token missing from the vocabulary
//! are both errors rather than silently passing through to the output.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").unwrap());

/// The closed set of templates the generator renders, one per artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Native header pinning application identity and signature hash.
    SignatureHeader,
    /// JNI glue source embedding the key init sequence.
    JniSource,
    /// Native build description.
    CmakeLists,
    /// Library-module Gradle fragment listing target ABIs.
    GradleModule,
    /// Managed stub class declaring the native methods.
    JavaStub,
    /// Demo activity wiring every exposed method to a control.
    DemoActivity,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 6] = [
        TemplateKind::SignatureHeader,
        TemplateKind::JniSource,
        TemplateKind::CmakeLists,
        TemplateKind::GradleModule,
        TemplateKind::JavaStub,
        TemplateKind::DemoActivity,
    ];

    /// File name inside the templates directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::SignatureHeader => "checksignature.h.tmpl",
            TemplateKind::JniSource => "JNIEncrypt.c.tmpl",
            TemplateKind::CmakeLists => "CMakeLists.txt.tmpl",
            TemplateKind::GradleModule => "build.gradle.kts.tmpl",
            TemplateKind::JavaStub => "JniClass.java.tmpl",
            TemplateKind::DemoActivity => "MainActivity.kt.tmpl",
        }
    }

    /// The full token vocabulary of this template. Every one of these must
    /// receive a value on render, and the template may contain no others.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::SignatureHeader => &["PACKAGE_NAME", "SIGNATURE_HASH"],
            TemplateKind::JniSource => &[
                "JNI_CLASS_PATH",
                "KEY_ARRAY_SIZE",
                "KEY_CHAR_LINES",
                "METHOD_ENCODE",
                "METHOD_DECODE",
                "METHOD_CHECK",
                "SIGN_NATIVE_SOURCE",
                "SIGN_METHOD_TABLE_ENTRY",
            ],
            TemplateKind::CmakeLists => &["SO_NAME", "SIGN_BUILD_SOURCES"],
            TemplateKind::GradleModule => &["ABI_FILTERS"],
            TemplateKind::JavaStub => &[
                "PACKAGE",
                "CLASS_NAME",
                "SO_NAME",
                "METHOD_ENCODE",
                "METHOD_DECODE",
                "METHOD_CHECK",
                "SIGN_NATIVE_DECLARATION",
            ],
            TemplateKind::DemoActivity => &[
                "APP_PACKAGE",
                "STUB_PACKAGE",
                "CLASS_NAME",
                "METHOD_ENCODE",
                "METHOD_DECODE",
                "METHOD_CHECK",
                "SIGN_UI_HOOK",
            ],
        }
    }
}

/// The six template texts, loaded once per run.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    texts: HashMap<TemplateKind, String>,
}

impl TemplateSet {
    /// Read every known template from `dir`. A missing or unreadable file
    /// is fatal and names the template.
    pub fn load(dir: &Path) -> RenderResult<Self> {
        let mut texts = HashMap::new();
        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            let text = std::fs::read_to_string(&path).map_err(|source| {
                RenderError::TemplateRead {
                    name: kind.file_name().to_string(),
                    source,
                }
            })?;
            texts.insert(kind, text);
        }
        debug!(dir = %dir.display(), "loaded {} templates", TemplateKind::ALL.len());
        Ok(Self { texts })
    }

    /// Build a set from in-memory texts. Intended for tests.
    pub fn from_texts(texts: HashMap<TemplateKind, String>) -> Self {
        Self { texts }
    }

    /// Substitute every token of `kind`'s vocabulary with its bound value.
    ///
    /// Fails if the substitution map lacks a vocabulary token, or if the
    /// template contains a token outside its vocabulary (which would
    /// otherwise pass through to the generated file verbatim).
    pub fn render(
        &self,
        kind: TemplateKind,
        substitutions: &HashMap<&str, String>,
    ) -> RenderResult<String> {
        let template = self
            .texts
            .get(&kind)
            .unwrap_or_else(|| unreachable!("TemplateSet::load covers every kind"));

        let mut rendered = template.clone();
        for token in kind.tokens() {
            let value = substitutions.get(token).ok_or_else(|| {
                RenderError::UnboundToken {
                    token: token.to_string(),
                    template: kind.file_name().to_string(),
                }
            })?;
            rendered = rendered.replace(&format!("{{{{{token}}}}}"), value);
        }

        if let Some(residual) = TOKEN_RE.captures(&rendered) {
            return Err(RenderError::ResidualToken {
                token: residual[1].to_string(),
                template: kind.file_name().to_string(),
            });
        }

        Ok(rendered)
    }
}
