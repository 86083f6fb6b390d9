//! Signing feature resolution
//!
//! The optional keyed-digest capability is toggled by the paired
//! `sign_key` / `method_sign` configuration fields. When enabled it must
//! surface consistently in five generated files at once; a partial
//! injection would produce a library whose managed stub declares a method
//! the native side never registers. Resolution therefore yields a single
//! bundle whose fragments are either all populated or all empty, computed
//! once and consumed by every template in the same run.
//!
//! The sign key is embedded as a plain string constant. The asymmetry with
//! the AES key (which is never embedded contiguously) is deliberate and
//! carried over from the system this generator targets.

use crate::config::BuildConfig;

/// JNI type signature shared by the digest method table entry and the
/// managed declaration.
const SIGN_JNI_SIGNATURE: &str = "(Ljava/lang/Object;Ljava/lang/String;)Ljava/lang/String;";

/// Matched set of code fragments for the signing feature, keyed by the
/// file each fragment is injected into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningBundle {
    /// File-scoped sign-key constant plus the digest function (C).
    pub native_source: String,
    /// `JNINativeMethod` table entry binding the method to the function (C).
    pub method_table_entry: String,
    /// `native` method declaration for the stub class (Java).
    pub java_declaration: String,
    /// Button wiring that invokes the method and reports failures (Kotlin).
    pub ui_hook: String,
    /// Extra native sources for the build description (CMake).
    pub cmake_sources: String,
}

impl SigningBundle {
    /// Resolve the bundle for a validated configuration: populated when
    /// signing is configured, all-empty otherwise.
    pub fn resolve(config: &BuildConfig) -> Self {
        match &config.signing {
            Some(signing) => Self::enabled(&signing.method_sign, &signing.sign_key),
            None => Self::default(),
        }
    }

    /// True when the fragments are populated.
    pub fn is_enabled(&self) -> bool {
        !self.native_source.is_empty()
    }

    /// All five fragments, for consistency checks.
    pub fn fragments(&self) -> [&str; 5] {
        [
            &self.native_source,
            &self.method_table_entry,
            &self.java_declaration,
            &self.ui_hook,
            &self.cmake_sources,
        ]
    }

    fn enabled(method: &str, key: &str) -> Self {
        let native_source = format!(
            r#"static const char *app_signkey = "{key}";

JNIEXPORT jstring JNICALL {method}_impl(JNIEnv *env, jobject instance, jobject context, jstring str_) {{

    if (check_signature(env, instance, context) != 1 || check_is_emulator(env) != 1) {{
        return charToJstring(env, UNSIGNATURE);
    }}

    const char *str = (*env)->GetStringUTFChars(env, str_, JNI_FALSE);

    size_t str_len = strlen(str);
    size_t key_len = strlen(app_signkey);
    char *combined = (char *) malloc(str_len + key_len + 1);
    strcpy(combined, str);
    strcat(combined, app_signkey);

    MD5_CTX md5;
    MD5Init(&md5);
    MD5Update(&md5, (unsigned char *) combined, strlen(combined));
    unsigned char digest[16];
    MD5Final(&md5, digest);

    free(combined);
    (*env)->ReleaseStringUTFChars(env, str_, str);

    char hex_result[33];
    for (int i = 0; i < 16; i++) {{
        sprintf(hex_result + i * 2, "%02x", digest[i]);
    }}
    hex_result[32] = '\0';

    return (*env)->NewStringUTF(env, hex_result);
}}
"#
        );

        let method_table_entry = format!(
            "\n        {{\"{method}\", \"{SIGN_JNI_SIGNATURE}\", (void *) {method}_impl}},"
        );

        let java_declaration = format!(
            "\n\n    /**\n     * Keyed MD5 digest of the input, rendered as 32 lowercase hex characters.\n     */\n    public static native String {method}(Object context, String str);"
        );

        let ui_hook = format!(
            r#"
        val btnSign = findViewById<MaterialButton>(R.id.btn_sign)
        val tvSignResult = findViewById<TextView>(R.id.tv_sign_result)
        btnSign.setOnClickListener {{
            val input = etInput.text?.toString()?.trim().orEmpty()
            try {{
                tvSignResult.text = NativeStub.{method}(this, input)
            }} catch (e: Exception) {{
                tvSignResult.text = "{method} failed: %s".format(e.message)
            }}
        }}
"#
        );

        let cmake_sources =
            format!("\n        # MD5 digest backing the {method} native method\n        src/main/cpp/md5.c");

        Self {
            native_source,
            method_table_entry,
            java_declaration,
            ui_hook,
            cmake_sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use serde_json::json;

    fn config(signing: bool) -> BuildConfig {
        let mut value = json!({
            "package_name": "com.example.myapp",
            "signature_hash": 1545485543,
            "aes_key": "0123456789ABCDEF",
            "interference_char": "#",
            "so_name": "MyEncrypt",
            "jni_class_package": "com.acme.sec",
            "jni_class_name": "Vault",
            "method_encode": "enc",
            "method_decode": "dec",
            "method_check": "chk",
            "abi_filters": ["arm64-v8a"]
        });
        if signing {
            let map = value.as_object_mut().unwrap();
            map.insert("sign_key".to_string(), json!("salt-123"));
            map.insert("method_sign".to_string(), json!("sig"));
        }
        BuildConfig::from_value(value).unwrap()
    }

    #[test]
    fn disabled_bundle_is_all_empty() {
        let bundle = SigningBundle::resolve(&config(false));
        assert!(!bundle.is_enabled());
        for fragment in bundle.fragments() {
            assert!(fragment.is_empty());
        }
    }

    #[test]
    fn enabled_bundle_has_five_fragments_naming_the_method() {
        let bundle = SigningBundle::resolve(&config(true));
        assert!(bundle.is_enabled());
        for fragment in bundle.fragments() {
            assert!(!fragment.is_empty());
            assert!(fragment.contains("sig"), "fragment lacks method name: {fragment}");
        }
    }

    #[test]
    fn sign_key_is_embedded_as_plain_literal() {
        let bundle = SigningBundle::resolve(&config(true));
        assert!(bundle
            .native_source
            .contains(r#"static const char *app_signkey = "salt-123";"#));
    }

    #[test]
    fn table_entry_and_declaration_share_the_jni_signature() {
        let bundle = SigningBundle::resolve(&config(true));
        assert!(bundle.method_table_entry.contains(SIGN_JNI_SIGNATURE));
        assert!(bundle
            .java_declaration
            .contains("public static native String sig(Object context, String str);"));
    }

    #[test]
    fn ui_hook_reports_failures() {
        let bundle = SigningBundle::resolve(&config(true));
        assert!(bundle.ui_hook.contains("catch (e: Exception)"));
        assert!(bundle.ui_hook.contains("NativeStub.sig"));
    }
}
