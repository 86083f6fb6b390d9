//! Build configuration parsing and validation
//!
//! The single gate every other component depends on: a raw `config.json`
//! document either becomes a fully validated [`BuildConfig`] or the run
//! aborts with an error naming the offending field. No defaults are
//! substituted and nothing downstream ever sees an unvalidated value.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{BuildResult, ConfigError, ConfigResult};

/// The four ABI variants the downstream NDK build recognizes.
pub const RECOGNIZED_ABIS: [&str; 4] = ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"];

/// Keys with this prefix are documentation inside config.json and are
/// stripped before validation.
pub const COMMENT_KEY_PREFIX: &str = "_comment";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").unwrap()
});

/// Optional signing capability — both fields or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Secret appended to the input before digesting. Embedded in the
    /// native source as a plain literal, unlike the AES key.
    pub sign_key: String,
    /// Name of the native method exposed to the managed side.
    pub method_sign: String,
}

/// Validated build configuration, immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Application identifier the signature check pins to.
    pub package_name: String,
    /// Expected hash code of the first APK signing certificate.
    pub signature_hash: i64,
    /// The AES-128 key, exactly 16 printable-ASCII characters.
    pub aes_key: String,
    /// Single character prepended to the encoded key to perturb its
    /// in-binary representation.
    pub interference_char: char,
    /// Shared-library name (without the `lib` prefix / `.so` suffix).
    pub so_name: String,
    /// Package of the generated stub class.
    pub jni_class_package: String,
    /// Name of the generated stub class.
    pub jni_class_name: String,
    pub method_encode: String,
    pub method_decode: String,
    pub method_check: String,
    /// Target ABIs, non-empty, each one of [`RECOGNIZED_ABIS`].
    pub abi_filters: Vec<String>,
    /// Present when the signing feature is enabled.
    pub signing: Option<SigningConfig>,
}

impl BuildConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        Ok(Self::from_value(value)?)
    }

    /// Parse and validate a configuration document from JSON text.
    pub fn from_json_str(text: &str) -> BuildResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value)?)
    }

    /// Validate an already-parsed JSON document.
    ///
    /// Comment keys are stripped first, then each check runs in order and
    /// fails with its own [`ConfigError`] variant. Validation is pure and
    /// all-or-nothing.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let Value::Object(raw) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let fields: Map<String, Value> = raw
            .into_iter()
            .filter(|(k, _)| !k.starts_with(COMMENT_KEY_PREFIX))
            .collect();

        const REQUIRED: [&str; 11] = [
            "package_name",
            "signature_hash",
            "aes_key",
            "interference_char",
            "so_name",
            "jni_class_package",
            "jni_class_name",
            "method_encode",
            "method_decode",
            "method_check",
            "abi_filters",
        ];
        for field in REQUIRED {
            if !fields.contains_key(field) {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        let aes_key = require_string(&fields, "aes_key")?;
        validate_aes_key(&aes_key)?;

        let marker_raw = require_string(&fields, "interference_char")?;
        let interference_char = validate_marker(&marker_raw)?;

        let package_name = require_string(&fields, "package_name")?;
        validate_package(&package_name, "package_name")?;

        let signature_hash = require_integer(&fields, "signature_hash")?;

        let so_name = require_string(&fields, "so_name")?;
        validate_identifier(&so_name, "so_name")?;

        let jni_class_package = require_string(&fields, "jni_class_package")?;
        validate_package(&jni_class_package, "jni_class_package")?;

        let jni_class_name = require_string(&fields, "jni_class_name")?;
        validate_identifier(&jni_class_name, "jni_class_name")?;

        let method_encode = require_string(&fields, "method_encode")?;
        validate_identifier(&method_encode, "method_encode")?;

        let method_decode = require_string(&fields, "method_decode")?;
        validate_identifier(&method_decode, "method_decode")?;

        let method_check = require_string(&fields, "method_check")?;
        validate_identifier(&method_check, "method_check")?;

        let abi_filters = require_string_array(&fields, "abi_filters")?;
        validate_abis(&abi_filters)?;

        let signing = validate_signing(&fields)?;

        Ok(Self {
            package_name,
            signature_hash,
            aes_key,
            interference_char,
            so_name,
            jni_class_package,
            jni_class_name,
            method_encode,
            method_decode,
            method_check,
            abi_filters,
            signing,
        })
    }

    /// True when the optional signing feature is enabled.
    pub fn signing_enabled(&self) -> bool {
        self.signing.is_some()
    }

    /// Slash-separated class path used by `FindClass` in the JNI glue,
    /// e.g. `com/acme/sec/Vault`.
    pub fn jni_class_path(&self) -> String {
        format!(
            "{}/{}",
            self.jni_class_package.replace('.', "/"),
            self.jni_class_name
        )
    }
}

fn require_string(fields: &Map<String, Value>, field: &str) -> ConfigResult<String> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::WrongType {
            field: field.to_string(),
            expected: "a string".to_string(),
        }),
        None => Err(ConfigError::MissingField {
            field: field.to_string(),
        }),
    }
}

fn require_integer(fields: &Map<String, Value>, field: &str) -> ConfigResult<i64> {
    match fields.get(field) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ConfigError::WrongType {
            field: field.to_string(),
            expected: "an integer".to_string(),
        }),
        Some(_) => Err(ConfigError::WrongType {
            field: field.to_string(),
            expected: "an integer".to_string(),
        }),
        None => Err(ConfigError::MissingField {
            field: field.to_string(),
        }),
    }
}

fn require_string_array(fields: &Map<String, Value>, field: &str) -> ConfigResult<Vec<String>> {
    let Some(value) = fields.get(field) else {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
        });
    };
    let Value::Array(items) = value else {
        return Err(ConfigError::WrongType {
            field: field.to_string(),
            expected: "an array of strings".to_string(),
        });
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ConfigError::WrongType {
                field: field.to_string(),
                expected: "an array of strings".to_string(),
            }),
        })
        .collect()
}

fn is_printable_ascii(ch: char) -> bool {
    (' '..='~').contains(&ch)
}

/// Exactly 16 characters, every one printable ASCII.
///
/// Length is counted in Unicode scalar values; because the printable-ASCII
/// check runs over every character, the character count and the UTF-8 byte
/// count of an accepted key always coincide.
fn validate_aes_key(key: &str) -> ConfigResult<()> {
    if let Some(ch) = key.chars().find(|ch| !is_printable_ascii(*ch)) {
        return Err(ConfigError::NonPrintableAscii {
            field: "aes_key".to_string(),
            ch,
        });
    }
    let length = key.chars().count();
    if length != 16 {
        return Err(ConfigError::KeyLength { length });
    }
    Ok(())
}

/// One printable-ASCII character, rejected (never escaped) when it could
/// not appear verbatim inside a generated `'c'` literal.
fn validate_marker(raw: &str) -> ConfigResult<char> {
    let mut chars = raw.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(ConfigError::MarkerLength {
            value: raw.to_string(),
        });
    };
    if !is_printable_ascii(ch) {
        return Err(ConfigError::NonPrintableAscii {
            field: "interference_char".to_string(),
            ch,
        });
    }
    if ch == '\'' || ch == '\\' {
        return Err(ConfigError::MarkerUnsafe { ch });
    }
    Ok(ch)
}

fn validate_identifier(value: &str, field: &str) -> ConfigResult<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn validate_package(value: &str, field: &str) -> ConfigResult<()> {
    if PACKAGE_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidPackage {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn validate_abis(abis: &[String]) -> ConfigResult<()> {
    if abis.is_empty() {
        return Err(ConfigError::EmptyAbiList);
    }
    for abi in abis {
        if !RECOGNIZED_ABIS.contains(&abi.as_str()) {
            return Err(ConfigError::UnknownAbi {
                value: abi.clone(),
                allowed: RECOGNIZED_ABIS.join(", "),
            });
        }
    }
    Ok(())
}

/// `sign_key` and `method_sign` form an atomic feature toggle.
fn validate_signing(fields: &Map<String, Value>) -> ConfigResult<Option<SigningConfig>> {
    let has_key = fields.contains_key("sign_key");
    let has_method = fields.contains_key("method_sign");
    match (has_key, has_method) {
        (false, false) => Ok(None),
        (true, false) => Err(ConfigError::UnpairedSigningField {
            present: "sign_key".to_string(),
            missing: "method_sign".to_string(),
        }),
        (false, true) => Err(ConfigError::UnpairedSigningField {
            present: "method_sign".to_string(),
            missing: "sign_key".to_string(),
        }),
        (true, true) => {
            let sign_key = require_string(fields, "sign_key")?;
            let method_sign = require_string(fields, "method_sign")?;
            validate_identifier(&method_sign, "method_sign")?;
            Ok(Some(SigningConfig {
                sign_key,
                method_sign,
            }))
        }
    }
}
