use super::*;

fn temp_mirror() -> (tempfile::TempDir, FileMirror) {
    let dir = tempfile::tempdir().unwrap();
    let mirror = FileMirror::new(dir.path().join("nested").join("session.json"));
    (dir, mirror)
}

#[test]
fn file_mirror_missing_file_loads_none() {
    let (_dir, mirror) = temp_mirror();
    assert!(mirror.load().unwrap().is_none());
}

#[test]
fn file_mirror_store_then_load() {
    let (_dir, mirror) = temp_mirror();
    mirror.store("access-1").unwrap();
    assert_eq!(mirror.load().unwrap().as_deref(), Some("access-1"));
}

#[test]
fn file_mirror_writes_auth_token_key() {
    let (_dir, mirror) = temp_mirror();
    mirror.store("access-1").unwrap();
    let raw = std::fs::read_to_string(mirror.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["authToken"], "access-1");
    assert!(json.get("refresh").is_none());
}

#[test]
fn file_mirror_overwrites_previous_token() {
    let (_dir, mirror) = temp_mirror();
    mirror.store("old").unwrap();
    mirror.store("new").unwrap();
    assert_eq!(mirror.load().unwrap().as_deref(), Some("new"));
}

#[test]
fn file_mirror_clear_removes_file_and_is_idempotent() {
    let (_dir, mirror) = temp_mirror();
    mirror.store("access-1").unwrap();
    mirror.clear().unwrap();
    assert!(!mirror.path().exists());
    mirror.clear().unwrap();
}

#[test]
fn file_mirror_malformed_file_errors() {
    let (_dir, mirror) = temp_mirror();
    std::fs::create_dir_all(mirror.path().parent().unwrap()).unwrap();
    std::fs::write(mirror.path(), "not json").unwrap();
    assert!(matches!(mirror.load(), Err(MirrorError::Malformed { .. })));
}

#[cfg(unix)]
#[test]
fn file_mirror_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let (_dir, mirror) = temp_mirror();
    mirror.store("access-1").unwrap();
    let mode = std::fs::metadata(mirror.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn no_mirror_never_remembers() {
    let mirror = NoMirror;
    mirror.store("access-1").unwrap();
    assert!(mirror.load().unwrap().is_none());
}
