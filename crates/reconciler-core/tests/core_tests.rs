//! Tests for reconciler-core: field paths, patches, delays, errors, settings

use reconciler_core::*;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

// ===========================================================================
// FieldPath
// ===========================================================================

#[test]
fn field_path_parse_and_display() {
    let path = FieldPath::parse("metadata.labels");
    assert_eq!(path.keys(), &["metadata".to_string(), "labels".to_string()]);
    assert_eq!(path.to_string(), "metadata.labels");
}

#[test]
fn field_path_drops_empty_segments() {
    assert_eq!(FieldPath::parse(".a..b."), FieldPath::parse("a.b"));
    assert!(FieldPath::parse("").is_root());
}

#[test]
fn field_path_serde_as_string() {
    let path: FieldPath = serde_json::from_str(r#""status.reconciler.dummy""#).unwrap();
    assert_eq!(path, FieldPath::parse("status.reconciler.dummy"));
    assert_eq!(serde_json::to_string(&path).unwrap(), r#""status.reconciler.dummy""#);
}

// ===========================================================================
// Patch
// ===========================================================================

#[test]
fn patch_empty_by_default() {
    let patch = Patch::new();
    assert!(patch.is_empty());
    assert_eq!(patch.len(), 0);
}

#[test]
fn patch_remove_sets_null() {
    let mut patch = Patch::new();
    patch.remove(&"metadata.annotations.a".into());
    assert_eq!(patch.get(&"metadata.annotations.a".into()), Some(&json!(null)));
    assert!(!patch.is_empty());
}

#[test]
fn patch_try_from_value() {
    let patch = Patch::try_from(json!({"spec": {"x": 1}})).unwrap();
    assert_eq!(patch.get(&"spec.x".into()), Some(&json!(1)));
    assert!(Patch::try_from(json!(null)).unwrap().is_empty());
    assert!(matches!(Patch::try_from(json!([1])), Err(Error::Patch(_))));
}

#[test]
fn patch_display_is_json() {
    let mut patch = Patch::new();
    patch.set(&"spec.x".into(), json!(1));
    assert_eq!(patch.to_string(), r#"{"spec":{"x":1}}"#);
}

// ===========================================================================
// DelaySet
// ===========================================================================

#[test]
fn delay_set_conversions() {
    assert_eq!(DelaySet::from(Duration::from_secs(2)).minimum(), Some(Duration::from_secs(2)));
    assert_eq!(DelaySet::from(None::<Duration>).minimum(), None);
    let delays: DelaySet = [Duration::from_secs(7), Duration::from_secs(4)].into_iter().collect();
    assert_eq!(delays.minimum(), Some(Duration::from_secs(4)));
    assert_eq!(delays.len(), 2);
}

#[test]
fn delay_set_from_secs_with_none() {
    let delays = DelaySet::from_secs_f64([Some(5.0), None]);
    assert_eq!(delays.minimum(), Some(Duration::from_secs(5)));
    assert!(!delays.is_empty());
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_classification() {
    assert!(Error::fatal("boom").is_fatal());
    assert!(Error::Cancelled.is_fatal());
    assert!(!Error::temporary("retry").is_fatal());
    assert!(Error::temporary("retry").is_throttleable());
    assert!(Error::permanent("bad").is_throttleable());
    assert!(!Error::fatal("boom").is_throttleable());
    assert!(!Error::ConfigError("x".into()).is_throttleable());
}

#[test]
fn error_display() {
    assert_eq!(Error::patch("403").to_string(), "patch failed: 403");
    assert_eq!(Error::temporary("later").to_string(), "temporary error: later");
}

// ===========================================================================
// Settings
// ===========================================================================

#[test]
fn settings_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.effects.keepalive(), Duration::from_secs(600));
    assert_eq!(settings.effects.known_inconsistencies.len(), 3);
    assert!(settings
        .effects
        .known_inconsistencies
        .contains(&FieldPath::parse("metadata.finalizers")));
    assert_eq!(settings.batching.error_delays()[0], Duration::from_secs(1));
    assert_eq!(settings.batching.error_delays().len(), 15);
    assert_eq!(settings.persistence.progress_storage, ProgressStorageKind::Status);
}

#[test]
fn settings_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.effects.keepalive_secs, 600);
}

#[test]
fn settings_load_partial_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[effects]\nkeepalive_secs = 30\n\n[batching]\nerror_delays = [2.0, 4.0]\n\n[persistence]\nprogress_storage = \"smart\""
    )
    .unwrap();
    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.effects.keepalive(), Duration::from_secs(30));
    assert_eq!(settings.effects.known_inconsistencies.len(), 3);
    assert_eq!(
        settings.batching.error_delays(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
    assert_eq!(settings.persistence.progress_storage, ProgressStorageKind::Smart);
    assert_eq!(settings.persistence.status_name, "reconciler");
}

#[test]
fn settings_load_invalid_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[effects]\nkeepalive_secs = \"soon\"").unwrap();
    assert!(matches!(Settings::load(file.path()), Err(Error::ConfigError(_))));
}

#[test]
fn settings_toml_roundtrip() {
    let text = Settings::default().to_toml();
    let back: Settings = toml::from_str(&text).unwrap();
    assert_eq!(back.effects.keepalive_secs, 600);
    assert_eq!(back.persistence.annotations_prefix, "reconciler.dev");
}
