//! End-to-end generation tests — run the full pipeline against the real
//! template set and inspect the written artifacts.
//!
//! These tests never invoke Gradle; they stop at the generated sources,
//! which is where every invariant of the pipeline is observable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use aes_builder::{generate_project, BuildConfig, BuildError, TemplateSet, WritePolicy};

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn templates() -> TemplateSet {
    TemplateSet::load(&templates_dir()).expect("load repo templates")
}

fn base_value() -> Value {
    json!({
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
    })
}

fn config(value: Value) -> BuildConfig {
    BuildConfig::from_value(value).expect("valid test config")
}

fn signing_value() -> Value {
    let mut value = base_value();
    let map = value.as_object_mut().unwrap();
    map.insert("sign_key".to_string(), json!("salt-123"));
    map.insert("method_sign".to_string(), json!("sig"));
    value
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative))
        .unwrap_or_else(|e| panic!("read {relative}: {e}"))
}

/// Reverses the embedded init sequence the way the runtime decoder does.
fn decode_embedded_key(jni_source: &str) -> Vec<u8> {
    let combined: String = jni_source
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("s[n++] = '")
                .and_then(|rest| rest.chars().next())
        })
        .collect();
    assert!(!combined.is_empty(), "no init sequence found");
    STANDARD.decode(&combined[1..]).expect("valid base64 remainder")
}

#[test]
fn minimal_scenario_generates_consistent_artifacts() {
    let root = tempfile::tempdir().unwrap();
    generate_project(
        &config(base_value()),
        &templates(),
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap();

    let stub = read(root.path(), "lib_module/src/main/java/com/acme/sec/Vault.java");
    assert!(stub.contains("package com.acme.sec;"));
    assert!(stub.contains("public class Vault"));
    assert!(stub.contains("System.loadLibrary(\"MyEncrypt\")"));
    assert_eq!(stub.matches("native").count(), 3);
    for method in ["enc", "dec", "chk"] {
        assert!(stub.contains(&format!(" {method}(Object context")), "{method}");
    }

    let jni = read(root.path(), "lib_module/src/main/cpp/JNIEncrypt.c");
    assert!(jni.contains("#define JNIREG_CLASS \"com/acme/sec/Vault\""));
    assert_eq!(decode_embedded_key(&jni), b"0123456789ABCDEF");
    // 24 base64 chars + marker, one spare slot for the terminator
    assert!(jni.contains("char s[26];"));

    let header = read(root.path(), "lib_module/src/main/cpp/checksignature.h");
    assert!(header.contains("\"com.example.myapp\""));
    assert!(header.contains("1545485543"));

    let gradle = read(root.path(), "lib_module/build.gradle.kts");
    assert!(gradle.contains("abiFilters += listOf(\"arm64-v8a\")"));

    let activity = read(
        root.path(),
        "app/src/main/kotlin/com/example/myapp/MainActivity.kt",
    );
    assert!(activity.contains("package com.example.myapp"));
    assert!(activity.contains("import com.acme.sec.Vault"));
    assert!(activity.contains("NativeStub.enc"));
    assert!(activity.contains("NativeStub.dec"));
    assert!(activity.contains("NativeStub.chk"));
}

#[test]
fn plaintext_key_never_appears_contiguously() {
    let root = tempfile::tempdir().unwrap();
    let plan = generate_project(
        &config(base_value()),
        &templates(),
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap();

    let encoded = STANDARD.encode(b"0123456789ABCDEF");
    for artifact in &plan.artifacts {
        assert!(
            !artifact.contents.contains("0123456789ABCDEF"),
            "raw key leaked into {}",
            artifact.relative_path.display()
        );
        assert!(
            !artifact.contents.contains(&encoded),
            "encoded key leaked contiguously into {}",
            artifact.relative_path.display()
        );
    }
}

#[test]
fn disabled_signing_leaves_no_trace() {
    let root = tempfile::tempdir().unwrap();
    let plan = generate_project(
        &config(base_value()),
        &templates(),
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap();

    for artifact in &plan.artifacts {
        for marker in ["app_signkey", "md5.c", "btn_sign", "_impl"] {
            assert!(
                !artifact.contents.contains(marker),
                "signing trace {marker:?} in {}",
                artifact.relative_path.display()
            );
        }
    }

    let jni = read(root.path(), "lib_module/src/main/cpp/JNIEncrypt.c");
    assert_eq!(jni.matches("(void *)").count(), 3);
}

#[test]
fn enabled_signing_appears_in_all_five_destinations() {
    let root = tempfile::tempdir().unwrap();
    generate_project(
        &config(signing_value()),
        &templates(),
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap();

    let jni = read(root.path(), "lib_module/src/main/cpp/JNIEncrypt.c");
    assert!(jni.contains("static const char *app_signkey = \"salt-123\";"));
    assert!(jni.contains("JNICALL sig_impl("));
    assert!(jni.contains("{\"sig\", \"(Ljava/lang/Object;Ljava/lang/String;)Ljava/lang/String;\", (void *) sig_impl},"));
    assert_eq!(jni.matches("(void *)").count(), 4);

    let cmake = read(root.path(), "lib_module/CMakeLists.txt");
    assert!(cmake.contains("src/main/cpp/md5.c"));
    assert!(cmake.contains("sig"));

    let stub = read(root.path(), "lib_module/src/main/java/com/acme/sec/Vault.java");
    assert!(stub.contains("public static native String sig(Object context, String str);"));
    assert_eq!(stub.matches("native").count(), 4);

    let activity = read(
        root.path(),
        "app/src/main/kotlin/com/example/myapp/MainActivity.kt",
    );
    assert!(activity.contains("NativeStub.sig"));
    assert!(activity.contains("btn_sign"));
}

#[test]
fn two_runs_are_byte_identical() {
    let templates = templates();
    let config = config(signing_value());

    let mut trees: Vec<HashMap<PathBuf, String>> = Vec::new();
    for _ in 0..2 {
        let root = tempfile::tempdir().unwrap();
        let plan =
            generate_project(&config, &templates, root.path(), WritePolicy::Direct).unwrap();
        let tree = plan
            .artifacts
            .iter()
            .map(|a| {
                (
                    a.relative_path.clone(),
                    read(root.path(), a.relative_path.to_str().unwrap()),
                )
            })
            .collect();
        trees.push(tree);
    }
    assert_eq!(trees[0], trees[1]);
}

#[test]
fn staged_and_direct_produce_the_same_tree() {
    let templates = templates();
    let config = config(base_value());

    let direct = tempfile::tempdir().unwrap();
    let plan =
        generate_project(&config, &templates, direct.path(), WritePolicy::Direct).unwrap();

    let staged = tempfile::tempdir().unwrap();
    generate_project(&config, &templates, staged.path(), WritePolicy::Staged).unwrap();

    for artifact in &plan.artifacts {
        let relative = artifact.relative_path.to_str().unwrap();
        assert_eq!(
            read(direct.path(), relative),
            read(staged.path(), relative),
            "{relative}"
        );
    }
}

#[test]
fn stale_stub_does_not_survive_a_rename() {
    let root = tempfile::tempdir().unwrap();
    let templates = templates();

    generate_project(
        &config(base_value()),
        &templates,
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap();
    assert!(root
        .path()
        .join("lib_module/src/main/java/com/acme/sec/Vault.java")
        .exists());

    let mut renamed = base_value();
    renamed
        .as_object_mut()
        .unwrap()
        .insert("jni_class_name".to_string(), json!("Keep"));
    generate_project(&config(renamed), &templates, root.path(), WritePolicy::Direct).unwrap();

    let package_dir = root.path().join("lib_module/src/main/java/com/acme/sec");
    assert!(package_dir.join("Keep.java").exists());
    assert!(!package_dir.join("Vault.java").exists());
}

#[test]
fn unrecognized_template_token_aborts_before_any_write() {
    // Copy the real templates and plant a token outside the vocabulary.
    let tmpl_dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(templates_dir()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), tmpl_dir.path().join(entry.file_name())).unwrap();
    }
    let cmake = tmpl_dir.path().join("CMakeLists.txt.tmpl");
    let mut text = std::fs::read_to_string(&cmake).unwrap();
    text.push_str("\n# {{BOGUS_TOKEN}}\n");
    std::fs::write(&cmake, text).unwrap();

    let templates = TemplateSet::load(tmpl_dir.path()).unwrap();
    let root = tempfile::tempdir().unwrap();
    let err = generate_project(
        &config(base_value()),
        &templates,
        root.path(),
        WritePolicy::Direct,
    )
    .unwrap_err();

    assert!(matches!(err, BuildError::Render(_)), "{err}");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn example_config_in_repo_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.example.json");
    let config = BuildConfig::load(&path).unwrap();
    assert!(config.signing_enabled());
    assert_eq!(config.aes_key.len(), 16);
}

#[test]
fn missing_template_file_is_fatal_and_named() {
    let tmpl_dir = tempfile::tempdir().unwrap();
    let err = TemplateSet::load(tmpl_dir.path()).unwrap_err();
    assert!(err.to_string().contains(".tmpl"));
}
