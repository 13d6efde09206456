use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub seed_per_collection: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            seed_per_collection: 30,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("mock_api.toml"), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(table) = toml::from_str::<toml::Table>(&raw) {
            let file_cfg: HashMap<String, String> = table
                .into_iter()
                .map(|(key, value)| match value {
                    toml::Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect();
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.bind_addr = v.clone();
            }
            if let Some(v) = file_cfg.get("seed_per_collection") {
                set_seed_count(&mut settings, v);
            }
        }
    }

    if let Some(v) = env("MOCK_API_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__SEED_PER_COLLECTION") {
        set_seed_count(&mut settings, &v);
    }

    settings
}

fn set_seed_count(settings: &mut Settings, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<u32>() {
        settings.seed_per_collection = parsed;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
