use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn appends_trailing_slash_to_base_path() {
    let url = normalize_base_url("https://api.example.com/api").expect("url");
    assert_eq!(url.as_str(), "https://api.example.com/api/");
    assert_eq!(
        url.join("auth/me/").expect("join").as_str(),
        "https://api.example.com/api/auth/me/"
    );
}

#[test]
fn keeps_existing_trailing_slash() {
    let url = normalize_base_url("  http://localhost:8000/api/ ").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/api/");
}

#[test]
fn rejects_empty_and_non_http_urls() {
    assert!(normalize_base_url("").is_err());
    assert!(normalize_base_url("ftp://example.com/api").is_err());
    assert!(normalize_base_url("not a url").is_err());
}

#[test]
fn file_settings_override_defaults_partially() {
    let mut settings = ClientSettings::default();
    apply_file_settings(
        &mut settings,
        r#"
api_base_url = "https://market.example.com/api"
request_timeout_secs = 4
prefetch_dual_role = true
"#,
    )
    .expect("apply");

    assert_eq!(settings.api_base_url, "https://market.example.com/api");
    assert_eq!(settings.request_timeout, Duration::from_secs(4));
    assert!(settings.prefetch_dual_role);
    assert_eq!(settings.login_path, "/auth/login");
}

#[test]
fn malformed_file_settings_are_rejected() {
    let mut settings = ClientSettings::default();
    assert!(apply_file_settings(&mut settings, "request_timeout_secs = \"soon\"").is_err());
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn loads_settings_from_explicit_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("marketplace_settings_{suffix}.toml"));
    fs::write(&path, "login_path = \"/signin\"\n").expect("write settings");

    let settings = load_settings_from(&path).expect("load");
    assert_eq!(settings.login_path, "/signin");

    fs::remove_file(path).expect("cleanup");
}
