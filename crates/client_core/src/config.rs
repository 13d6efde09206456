use std::{collections::HashMap, fs, path::Path};

use crate::{
    controller::{ControllerOptions, DEFAULT_PAGE_SIZE},
    transport::DEFAULT_API_BASE_URL,
};

pub const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub page_size: u32,
    pub refetch_after_mutation: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            refetch_after_mutation: false,
        }
    }
}

impl ClientSettings {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            page_size: self.page_size,
            refetch_after_mutation: self.refetch_after_mutation,
        }
    }
}

/// Defaults, then `dashboard.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, env);

    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let Ok(table) = toml::from_str::<toml::Table>(raw) else {
        return;
    };
    let file_cfg: HashMap<String, String> = table
        .into_iter()
        .map(|(key, value)| match value {
            toml::Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect();

    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("page_size") {
        set_page_size(settings, v);
    }
    if let Some(v) = file_cfg.get("refetch_after_mutation") {
        set_refetch(settings, v);
    }
}

fn apply_env(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("DASHBOARD_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__PAGE_SIZE") {
        set_page_size(settings, &v);
    }
    if let Some(v) = env("APP__REFETCH_AFTER_MUTATION") {
        set_refetch(settings, &v);
    }
}

fn set_page_size(settings: &mut ClientSettings, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<u32>() {
        if parsed > 0 {
            settings.page_size = parsed;
        }
    }
}

fn set_refetch(settings: &mut ClientSettings, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<bool>() {
        settings.refetch_after_mutation = parsed;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_point_at_public_api() {
        let settings = load_settings_from(Path::new("/nonexistent/dashboard.toml"), no_env);
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.api_base_url, "https://dummyjson.com/");
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("dashboard_settings_test_{suffix}.toml"));
        fs::write(
            &path,
            "api_base_url = \"http://localhost:9000\"\npage_size = 25\nrefetch_after_mutation = true\n",
        )
        .expect("write settings");

        let from_file = load_settings_from(&path, no_env);
        assert_eq!(from_file.api_base_url, "http://localhost:9000");
        assert_eq!(from_file.page_size, 25);
        assert!(from_file.refetch_after_mutation);

        let overridden = load_settings_from(&path, |key| match key {
            "APP__API_BASE_URL" => Some("http://127.0.0.1:8080".to_string()),
            "APP__PAGE_SIZE" => Some("5".to_string()),
            _ => None,
        });
        assert_eq!(overridden.api_base_url, "http://127.0.0.1:8080");
        assert_eq!(overridden.page_size, 5);
        assert!(overridden.refetch_after_mutation);

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn invalid_numbers_are_ignored() {
        let settings = load_settings_from(Path::new("/nonexistent/dashboard.toml"), |key| {
            match key {
                "APP__PAGE_SIZE" => Some("0".to_string()),
                "APP__REFETCH_AFTER_MUTATION" => Some("sometimes".to_string()),
                _ => None,
            }
        });
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
        assert!(!settings.refetch_after_mutation);
    }
}
