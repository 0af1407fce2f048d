use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use wallpaper_changer::Error;
use wallpaper_changer::state::{RoundRobinEntry, SelectionState};

fn corrupted_backups(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().contains(".corrupted."))
        .collect()
}

fn populated_state() -> SelectionState {
    let mut state = SelectionState::new();
    state.update(
        &[PathBuf::from("/w/a.jpg"), PathBuf::from("/w/left/c.jpg")],
        &["DP-1".to_string(), "HDMI-A-1".to_string()],
    );
    state.round_robin.insert(
        "/w".to_string(),
        RoundRobinEntry {
            images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            position: 1,
        },
    );
    state.round_robin.insert(
        "/w/left".to_string(),
        RoundRobinEntry {
            images: vec!["c.jpg".to_string()],
            position: 0,
        },
    );
    state
}

#[test]
fn save_then_load_round_trips() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    let state = populated_state();

    state.save(&path).unwrap();
    let loaded = SelectionState::load(&path);

    assert_eq!(loaded, state);
    assert!(!temp.path().join("state.json.tmp").exists());
}

#[test]
fn saved_document_has_expected_layout() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    populated_state().save(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains('\n'), "state file should be pretty-printed");

    let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(doc["version"], "1.0");
    assert!(doc["last_run"].is_string());
    assert_eq!(doc["current_wallpapers"]["DP-1"]["filename"], "a.jpg");
    assert_eq!(doc["round_robin"]["/w"]["position"], 1);
    assert_eq!(doc["round_robin"]["/w"]["images"][1], "b.jpg");
}

#[test]
fn missing_file_loads_fresh_state() {
    let temp = tempfile::tempdir().unwrap();
    let state = SelectionState::load(&temp.path().join("state.json"));
    assert_eq!(state, SelectionState::new());
    assert_eq!(state.version, "1.0");
    assert!(state.last_run.is_none());
}

#[test]
fn corrupted_file_is_quarantined_once() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    fs::write(&path, "{ invalid json content").unwrap();

    let state = SelectionState::load(&path);
    assert_eq!(state, SelectionState::new());
    assert!(!path.exists());

    let backups = corrupted_backups(temp.path());
    assert_eq!(backups.len(), 1);
    let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("state.json.corrupted."), "{name}");
    assert_eq!(
        fs::read_to_string(&backups[0]).unwrap(),
        "{ invalid json content"
    );

    let again = SelectionState::load(&path);
    assert_eq!(again, SelectionState::new());
    assert_eq!(corrupted_backups(temp.path()).len(), 1);
}

#[test]
fn schema_violation_is_quarantined() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    fs::write(
        &path,
        r#"{"version": "1.0", "current_wallpapers": {}, "round_robin": {"/w": {"images": ["a.jpg"]}}}"#,
    )
    .unwrap();

    assert_eq!(SelectionState::load(&path), SelectionState::new());
    assert_eq!(corrupted_backups(temp.path()).len(), 1);
}

#[test]
fn quarantine_never_overwrites_earlier_backup() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");

    fs::write(&path, "first").unwrap();
    SelectionState::load(&path);
    fs::write(&path, "second").unwrap();
    SelectionState::load(&path);

    let mut contents: Vec<String> = corrupted_backups(temp.path())
        .iter()
        .map(|backup| fs::read_to_string(backup).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, ["first", "second"]);
}

#[test]
fn save_overwrites_previous_state() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");

    populated_state().save(&path).unwrap();
    let fresh = SelectionState::new();
    fresh.save(&path).unwrap();

    assert_eq!(SelectionState::load(&path), fresh);
}

#[cfg(unix)]
#[test]
fn contended_lock_fails_fast_and_keeps_state() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    let original = populated_state();
    original.save(&path).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let other_writer = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(temp.path().join("state.json.tmp"))
        .unwrap();
    other_writer.try_lock_exclusive().unwrap();

    let err = SelectionState::new().save(&path).unwrap_err();
    assert!(matches!(err, Error::StateLocked(_)), "{err}");
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert!(temp.path().join("state.json.tmp").exists());

    FileExt::unlock(&other_writer).unwrap();
    drop(other_writer);

    SelectionState::new().save(&path).unwrap();
    assert_eq!(SelectionState::load(&path), SelectionState::new());
}

#[cfg(unix)]
#[test]
fn unwritable_directory_is_a_persistence_failure() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().unwrap();
    let locked_dir = temp.path().join("readonly");
    fs::create_dir(&locked_dir).unwrap();
    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();

    let path = locked_dir.join("state.json");
    let result = SelectionState::new().save(&path);

    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();

    // root ignores directory permissions
    if let Err(err) = result {
        assert!(matches!(err, Error::Persistence(_)), "{err}");
        assert!(!locked_dir.join("state.json.tmp").exists());
    }
}

#[test]
fn loosely_typed_documents_keep_their_cursors() {
    let documents = [
        r#"{"version": "1.0", "last_run": null, "current_wallpapers": {},
            "round_robin": {"/a": {"images": ["x.jpg"], "position": -2},
                            "/b": {"images": ["y.jpg", "z.jpg"], "position": 1}}}"#,
        r#"{"version": "1.0", "last_run": "2024-05-01T09:30:00+02:00", "current_wallpapers": {},
            "round_robin": {"/b": {"images": ["y.jpg", "z.jpg"], "position": 1}}}"#,
        r#"{"version": "1.0", "last_run": null, "current_wallpapers": {"DP-1": {"filename": "y.jpg"}},
            "round_robin": {"/b": {"images": ["y.jpg", "z.jpg"], "position": 1}}}"#,
    ];

    for document in documents {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, document).unwrap();

        let state = SelectionState::load(&path);
        assert_eq!(state.round_robin["/b"].position, 1, "{document}");
        assert!(path.exists(), "{document}");
        assert!(corrupted_backups(temp.path()).is_empty(), "{document}");
    }
}
