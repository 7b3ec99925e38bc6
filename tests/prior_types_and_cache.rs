//! Black-box integration tests for the prior-types loader and the
//! on-disk cache, exercised the way the CLI binary actually calls them:
//! against real files on a temporary filesystem, through the crate's
//! public API only.

use std::io::Write;

use flightcheck::cache::{SerializedTu, TuCache};
use flightcheck::prior_types;

#[test]
fn prior_types_load_parses_a_well_formed_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[
            {{
                "VariableName": "AP_AHRS.roll",
                "SemanticInfo": {{
                    "Units": ["rad"],
                    "CoordinateFrames": ["MAV_FRAME_BODY_FRD"]
                }}
            }}
        ]"#
    )
    .unwrap();

    let descriptions = prior_types::load(file.path()).expect("well-formed prior-types file should load");
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].variable_name, "AP_AHRS.roll");
    assert_eq!(descriptions[0].semantic_info.units, vec!["rad".to_string()]);
    assert_eq!(descriptions[0].semantic_info.coordinate_frames, vec!["MAV_FRAME_BODY_FRD".to_string()]);
}

#[test]
fn prior_types_load_reports_missing_file() {
    let missing = std::path::Path::new("/nonexistent/path/to/prior_types.json");
    assert!(prior_types::load(missing).is_err());
}

#[test]
fn prior_types_load_reports_malformed_json() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "not valid json").unwrap();
    assert!(prior_types::load(file.path()).is_err());
}

#[test]
fn cache_survives_a_process_restart_and_goes_stale_on_touch() {
    let cache_dir = tempfile::tempdir().unwrap();
    let source = tempfile::Builder::new().suffix(".cpp").tempfile().unwrap();

    {
        let cache = TuCache::new(Some(cache_dir.path().to_path_buf()));
        let stu = SerializedTu::new(
            source.path().to_string_lossy().into_owned(),
            "(set-logic ALL)\n(assert true)".to_string(),
            vec!["Variable x_m declared in a.cpp on line 3 (0)".to_string()],
        );
        cache.write_to_disk(&stu).unwrap();
    }

    // A brand new TuCache (standing in for a fresh process) still finds the
    // entry on disk, because the source file hasn't changed since.
    let reloaded_cache = TuCache::new(Some(cache_dir.path().to_path_buf()));
    let hit = reloaded_cache.get_stored(source.path()).expect("disk cache hit across instances");
    assert_eq!(hit.solver, "(set-logic ALL)\n(assert true)");

    // Touching the source file after the cache entry was written makes the
    // entry stale, even though it's still present on disk.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    filetime_touch(source.path());
    let stale_cache = TuCache::new(Some(cache_dir.path().to_path_buf()));
    assert!(stale_cache.get_stored(source.path()).is_none());
}

/// Bumps a file's modification time to "now" without pulling in a
/// dedicated crate for it.
fn filetime_touch(path: &std::path::Path) {
    let contents = std::fs::read(path).unwrap();
    std::fs::write(path, contents).unwrap();
}
