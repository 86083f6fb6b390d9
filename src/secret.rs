//! Key obfuscation
//!
//! A key embedded as a string literal (even base64-encoded) is trivially
//! recovered by scanning the compiled library's string table. Instead the
//! generated native source synthesizes the encoded key one character at a
//! time into a stack buffer. The paired runtime decoder reads the buffer,
//! discards the leading interference character, base64-decodes the rest and
//! uses the 16 decoded bytes as the AES key — so the marker position and the
//! base64 alphabet here are a compatibility contract with that decoder.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Derived per run from the validated configuration; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Declared size of the generated `char` buffer. One slot past the
    /// written characters is reserved for the `'\0'` the decoder appends
    /// at runtime; the init sequence never writes it.
    pub array_size: usize,
    /// One `s[n++] = 'c';` statement per character of
    /// `interference_char + base64(aes_key)`, in left-to-right order.
    pub init_lines: Vec<String>,
}

impl KeySpec {
    /// Derive the buffer-initialization sequence for a validated key and
    /// interference character.
    pub fn derive(aes_key: &str, marker: char) -> Self {
        let encoded = STANDARD.encode(aes_key.as_bytes());
        let combined = format!("{marker}{encoded}");

        let init_lines: Vec<String> = combined
            .chars()
            .map(|ch| format!("    s[n++] = '{ch}';"))
            .collect();

        Self {
            array_size: combined.chars().count() + 1,
            init_lines,
        }
    }

    /// The init sequence as a single text block for template injection.
    pub fn init_block(&self) -> String {
        self.init_lines.join("\n")
    }
}
