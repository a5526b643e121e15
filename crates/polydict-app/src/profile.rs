use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use polydict_config::Config;
use serde::{Deserialize, Serialize};

/// `$POLYDICT_HOME`, else `.polydict` in the user's home directory
pub fn polydict_root() -> PathBuf {
    if let Some(home) = env::var_os("POLYDICT_HOME") {
        return PathBuf::from(home);
    }

    env::var_os("HOME")
        .or_else(|| env::var_os("APPDATA"))
        .map(|home| PathBuf::from(home).join(".polydict"))
        .unwrap_or_else(|| PathBuf::from(".polydict"))
}

fn profiles_dir(root: &Path) -> PathBuf {
    root.join("profiles")
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    let profile: Profile = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse profile {}", path.display()))?;
    profile.value.validate()?;
    Ok(profile.value)
}

/// Creates the main profile from `seed` if it is missing
pub fn init_user_config(root: &Path, seed: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(profiles_dir(root))?;

    let main_profile = profiles_dir(root).join("main.json");
    if !main_profile.exists() {
        let profile = Profile {
            name: "main".into(),
            value: seed.clone(),
        };
        fs::write(&main_profile, serde_json::to_string_pretty(&profile)?)?;
        tracing::info!("Created main profile in {}", root.display());
    }

    Ok(())
}

/// Loads a user profile by name, falling back to the main profile
pub fn load_user_profile(root: &Path, name: &str) -> anyhow::Result<Config> {
    let profile_file = profiles_dir(root).join(format!("{name}.json"));
    if profile_file.exists() {
        return read_profile(&profile_file);
    }

    tracing::warn!("Profile {name} not found, falling back to main profile");
    read_profile(&profiles_dir(root).join("main.json"))
}

/// Saves `config` as a new named profile
pub fn save_profile(root: &Path, name: &str, config: &Config) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(profiles_dir(root))?;
    let profile = Profile {
        name: name.into(),
        value: config.clone(),
    };
    let file = profiles_dir(root).join(format!("{name}.json"));
    fs::write(&file, serde_json::to_string_pretty(&profile)?)?;
    tracing::info!("Created new profile: {name}");
    Ok(file)
}

/// Config for this run: a named profile when one is given, else the config
/// file, else built-in defaults
pub fn resolve_config(path: &Path, profile: Option<&str>) -> anyhow::Result<Config> {
    let from_file = || -> anyhow::Result<Config> {
        if path.exists() {
            tracing::info!("Loading config from {}", path.display());
            Config::load(path).with_context(|| format!("Invalid config {}", path.display()))
        } else {
            tracing::warn!("{} not found, using defaults", path.display());
            Ok(Config::new())
        }
    };

    match profile {
        Some(name) => {
            let root = polydict_root();
            init_user_config(&root, &from_file()?)?;
            load_user_profile(&root, name)
        }
        None => from_file(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        env::temp_dir().join(format!("polydict-profiles-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn main_profile_is_seeded_once() {
        let root = temp_root();
        let mut seed = Config::default();
        seed.network_timeout_ms = 1234;
        init_user_config(&root, &seed).unwrap();

        seed.network_timeout_ms = 9;
        init_user_config(&root, &seed).unwrap();

        let loaded = load_user_profile(&root, "main").unwrap();
        assert_eq!(loaded.network_timeout_ms, 1234);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unknown_profile_falls_back_to_main() {
        let root = temp_root();
        init_user_config(&root, &Config::default()).unwrap();

        let mut work = Config::default();
        work.lookup.max_total_results = 7;
        save_profile(&root, "work", &work).unwrap();

        assert_eq!(load_user_profile(&root, "work").unwrap().lookup.max_total_results, 7);
        assert_eq!(
            load_user_profile(&root, "missing").unwrap().lookup.max_total_results,
            200
        );
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let config = resolve_config(&temp_root().join("polydict.json"), None).unwrap();
        assert!(config.wordlists.is_empty());
    }
}
