#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests.
//!
//! Library code must stay panic-free: the event-handling boundary absorbs
//! every error, so a panic anywhere under it would take the whole session
//! down. These checks keep the clippy deny list in `Cargo.toml` intact.

use std::path::PathBuf;

fn manifest() -> toml::Table {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read '{}': {e}", path.display()));
    toml::from_str(&text).expect("Cargo.toml should parse")
}

const REQUIRED_DENY_LINTS: &[&str] = &[
    "unwrap_used",
    "expect_used",
    "panic",
    "todo",
    "unimplemented",
    "indexing_slicing",
];

#[test]
fn cargo_toml_denies_panic_prone_lints() {
    let manifest = manifest();
    let clippy = manifest
        .get("lints")
        .and_then(|lints| lints.get("clippy"))
        .and_then(|clippy| clippy.as_table())
        .expect("Cargo.toml is missing [lints.clippy]");

    for lint in REQUIRED_DENY_LINTS {
        assert_eq!(
            clippy.get(*lint).and_then(|level| level.as_str()),
            Some("deny"),
            "[lints.clippy] must set `{lint} = \"deny\"`"
        );
    }
}

#[test]
fn websocket_transport_is_the_default_feature() {
    let manifest = manifest();
    let default = manifest["features"]["default"]
        .as_array()
        .expect("features.default should be an array");
    assert!(
        default
            .iter()
            .any(|feature| feature.as_str() == Some("transport-websocket")),
        "the built-in WebSocket transport should stay enabled by default"
    );
}

#[test]
fn rust_version_is_declared() {
    let manifest = manifest();
    let rust_version = manifest["package"]["rust-version"]
        .as_str()
        .expect("package.rust-version should be set");
    assert!(
        rust_version.split('.').count() == 3,
        "rust-version should be a full semver triple, got {rust_version}"
    );
}
