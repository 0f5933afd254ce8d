//! Config hash stability.
//!
//! GREEN when:
//! - the same YAML twice yields the same config_hash,
//! - reordering keys does not change the hash,
//! - different values yield different hashes,
//! - an overlay layer overrides only the keys it names.

use shelf_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
server:
  addr: "0.0.0.0:8080"
  request_timeout_ms: 15000
database:
  url_env: "SHELF_DATABASE_URL"
  max_connections: 10
orders:
  total_policy: trust
"#;

/// Same content as BASE_YAML with keys in a different order.
const BASE_YAML_REORDERED: &str = r#"
orders:
  total_policy: trust
database:
  max_connections: 10
  url_env: "SHELF_DATABASE_URL"
server:
  request_timeout_ms: 15000
  addr: "0.0.0.0:8080"
"#;

const OVERLAY_YAML: &str = r#"
database:
  max_connections: 40
orders:
  total_policy: cover_items
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_only_named_keys() {
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    let max = merged
        .config_json
        .pointer("/database/max_connections")
        .and_then(|v| v.as_u64())
        .unwrap();
    assert_eq!(max, 40);

    let url_env = merged
        .config_json
        .pointer("/database/url_env")
        .and_then(|v| v.as_str())
        .unwrap();
    assert_eq!(url_env, "SHELF_DATABASE_URL", "untouched keys survive the overlay");

    let policy = merged
        .config_json
        .pointer("/orders/total_policy")
        .and_then(|v| v.as_str())
        .unwrap();
    assert_eq!(policy, "cover_items");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
