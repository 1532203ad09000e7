use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::catalog::ProfileCatalog;
use crate::config::RegistryConfig;
use crate::error::{EepError, Result};
use crate::profile::{Profile, ProfileDocument, ProfileId};

/// Profiles shipped with the crate.
pub const BUILTIN_PROFILES: &[&str] = &[
    include_str!("../profiles/F6-02-01.json"),
    include_str!("../profiles/D5-00-01.json"),
    include_str!("../profiles/A5-02-05.json"),
    include_str!("../profiles/A5-04-01.json"),
    include_str!("../profiles/D2-01-01.json"),
    include_str!("../profiles/D1079-01-00.json"),
];

/// In-memory profile catalog keyed by `(rorg, func, type)`.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, Profile>,
    config: RegistryConfig,
}

impl ProfileRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            profiles: BTreeMap::new(),
            config,
        }
    }

    /// Registry holding the bundled profiles.
    pub fn builtin() -> Result<Self> {
        Self::from_embedded(BUILTIN_PROFILES)
    }

    /// Register every profile of a JSON document (one profile or a list).
    /// Returns how many profiles were registered.
    pub fn register(&mut self, json: &str) -> Result<usize> {
        let document: ProfileDocument = serde_json::from_str(json)?;
        let profiles = document.into_profiles();
        let count = profiles.len();
        for profile in profiles {
            self.register_profile(profile)?;
        }
        Ok(count)
    }

    /// Register a single profile, replacing any profile with the same id.
    pub fn register_profile(&mut self, profile: Profile) -> Result<()> {
        if self.config.strict_mode {
            profile.validate()?;
        }

        if !self.profiles.contains_key(&profile.id) && self.profiles.len() >= self.config.max_profiles
        {
            return Err(EepError::LoadFailed(format!(
                "profile count exceeds configured max ({})",
                self.config.max_profiles
            )));
        }

        tracing::debug!(profile = %profile.id, blocks = profile.blocks.len(), "profile registered");
        if let Some(previous) = self.profiles.insert(profile.id, profile) {
            tracing::debug!(profile = %previous.id, "replaced existing profile");
        }
        Ok(())
    }

    /// Load from embedded JSON documents.
    pub fn from_embedded(documents: &[&str]) -> Result<Self> {
        let mut registry = Self::new();
        for document in documents {
            registry.register(document)?;
        }
        Ok(registry)
    }

    /// Load every `*.json` file of a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load every `*.json` file of a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        registry.load_directory(path)?;
        Ok(registry)
    }

    /// Add every `*.json` file of a directory to this registry.
    pub fn load_directory(&mut self, path: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(path)
            .map_err(|err| EepError::LoadFailed(format!("{}: {err}", path.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| EepError::LoadFailed(err.to_string()))?;
            let entry_path = entry.path();
            let is_profile_file = entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            let file_type = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| EepError::LoadFailed(err.to_string()))?
                .file_type();

            if file_type.is_symlink() {
                if is_profile_file {
                    return Err(EepError::LoadFailed(format!(
                        "refusing to load profile symlink: {}",
                        entry_path.display()
                    )));
                }
                continue;
            }
            if file_type.is_file() && is_profile_file {
                files.push(entry_path);
            }
        }
        // Deterministic order so later files override earlier ones predictably.
        files.sort();

        let mut loaded = 0usize;
        for file_path in files {
            let content = read_limited(&file_path, self.config.max_profile_file_size)?;
            loaded += self.register(&content).map_err(|err| match err {
                EepError::Json(err) => {
                    EepError::LoadFailed(format!("{}: {err}", file_path.display()))
                }
                other => other,
            })?;
        }
        tracing::info!(path = %path.display(), profiles = loaded, "profile directory loaded");
        Ok(loaded)
    }

    /// Look up a profile.
    pub fn get(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// Registered profiles in id order.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCatalog for ProfileRegistry {
    fn profile(&self, id: &ProfileId) -> Option<&Profile> {
        self.get(id)
    }
}

fn read_limited(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|err| {
        EepError::LoadFailed(format!("failed opening profile {}: {err}", path.display()))
    })?;
    let size = file
        .metadata()
        .map_err(|err| EepError::LoadFailed(err.to_string()))?
        .len();
    if size > max_bytes as u64 {
        return Err(EepError::LoadFailed(format!(
            "profile file too large ({size} bytes): {}",
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            EepError::LoadFailed(format!("failed reading profile {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(EepError::LoadFailed(format!(
            "profile file too large while reading: {}",
            path.display()
        )));
    }
    Ok(content)
}
