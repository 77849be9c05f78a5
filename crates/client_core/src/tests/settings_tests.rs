use super::*;

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_are_usable() {
    let settings = Settings::default();
    assert_eq!(settings.retry_delay, Duration::from_secs(3));
    assert_eq!(settings.resume_policy, ResumePolicy::Immediate);
    assert!(settings.token.is_none());
    assert!(normalize_server_url(&settings.server_url).is_ok());
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    settings
        .apply_file(
            r#"
server_url = "https://chat.example.com/api/"
token = "tok"
refresh_token = "ref"
uid = 7
retry_delay_ms = 250
resume_policy = "on_credential_change"
state_file = "state/mirror.json"
"#,
        )
        .expect("parse");

    assert_eq!(settings.server_url, "https://chat.example.com/api/");
    assert_eq!(settings.token.as_deref(), Some("tok"));
    assert_eq!(settings.refresh_token.as_deref(), Some("ref"));
    assert_eq!(settings.uid, Some(7));
    assert_eq!(settings.retry_delay, Duration::from_millis(250));
    assert_eq!(settings.resume_policy, ResumePolicy::OnCredentialChange);
    assert_eq!(settings.state_file, Some(PathBuf::from("state/mirror.json")));
}

#[test]
fn partial_file_keeps_other_defaults() {
    let mut settings = Settings::default();
    settings.apply_file("token = \"tok\"").expect("parse");
    assert_eq!(settings.server_url, Settings::default().server_url);
    assert_eq!(settings.retry_delay, Duration::from_secs(3));
}

#[test]
fn malformed_file_is_rejected() {
    let mut settings = Settings::default();
    assert!(settings.apply_file("retry_delay_ms = \"soon\"").is_err());
}

#[test]
fn environment_overrides_file() {
    let mut settings = Settings::default();
    settings.apply_file("token = \"from-file\"").expect("parse");
    settings.apply_env(env_of(&[
        ("MIRROR_SERVER_URL", "http://a.example"),
        ("APP__SERVER_URL", "http://b.example"),
        ("MIRROR_TOKEN", "from-env"),
        ("MIRROR_RETRY_DELAY_MS", "1500"),
        ("MIRROR_RESUME_POLICY", "on_credential_change"),
        ("MIRROR_STATE_FILE", "/tmp/mirror.json"),
    ]));

    assert_eq!(settings.server_url, "http://b.example");
    assert_eq!(settings.token.as_deref(), Some("from-env"));
    assert_eq!(settings.retry_delay, Duration::from_millis(1500));
    assert_eq!(settings.resume_policy, ResumePolicy::OnCredentialChange);
    assert_eq!(settings.state_file, Some(PathBuf::from("/tmp/mirror.json")));
    assert_eq!(settings.stream_settings().retry_delay, Duration::from_millis(1500));
}

#[test]
fn unparsable_environment_values_are_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(env_of(&[
        ("MIRROR_RETRY_DELAY_MS", "soon"),
        ("MIRROR_RESUME_POLICY", "sometimes"),
        ("MIRROR_UID", "me"),
    ]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn server_url_is_trimmed_and_checked() {
    assert_eq!(
        normalize_server_url(" http://localhost:3000/api/ ").expect("valid"),
        "http://localhost:3000/api"
    );
    assert!(matches!(
        normalize_server_url("ftp://localhost"),
        Err(ClientError::Config(_))
    ));
    assert!(normalize_server_url("not a url").is_err());
}

#[test]
fn missing_settings_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join("mirror_settings_that_does_not_exist.toml");
    let settings = load_settings(&path).expect("load");
    assert!(settings.server_url.starts_with("http"));
}
