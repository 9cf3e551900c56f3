use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.persistence, TokenPersistence::Memory);
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("BLOG_API_URL", "https://blog.example.test/api/"),
        ("BLOG_REQUEST_TIMEOUT_SECS", "42"),
        ("BLOG_CONNECT_TIMEOUT_SECS", "7"),
        ("BLOG_TOKEN_PERSISTENCE", "mirror"),
        ("BLOG_TOKEN_MIRROR_PATH", "/tmp/blogline-test/session.json"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://blog.example.test/api");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.persistence, TokenPersistence::Mirror(PathBuf::from("/tmp/blogline-test/session.json")));
}

#[test]
fn from_lookup_rejects_bad_url() {
    let err = ClientConfig::from_lookup(lookup_from(&[("BLOG_API_URL", "localhost:8000")])).unwrap_err();
    assert!(err.to_string().contains("invalid BLOG_API_URL"));
}

#[test]
fn from_lookup_rejects_zero_timeout() {
    let err = ClientConfig::from_lookup(lookup_from(&[("BLOG_REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
    assert!(err.to_string().contains("invalid timeout"));
}

#[test]
fn from_lookup_rejects_garbage_timeout() {
    assert!(ClientConfig::from_lookup(lookup_from(&[("BLOG_CONNECT_TIMEOUT_SECS", "soon")])).is_err());
}

#[test]
fn parse_persistence_unknown_mode_errors() {
    let err = parse_persistence(Some("disk"), None).unwrap_err();
    assert!(err.to_string().contains("unsupported token persistence"));
}

#[test]
fn parse_persistence_explicit_path_wins() {
    let policy = parse_persistence(Some("mirror"), Some(PathBuf::from("/x/y.json"))).unwrap();
    assert_eq!(policy, TokenPersistence::Mirror(PathBuf::from("/x/y.json")));
}

#[test]
fn default_mirror_path_ends_with_app_file() {
    if let Some(path) = default_mirror_path() {
        assert!(path.ends_with("blogline/session.json"));
    }
}

#[test]
fn normalize_base_url_trims_whitespace_and_slashes() {
    assert_eq!(normalize_base_url("  http://h:1/api// ").unwrap(), "http://h:1/api");
}
