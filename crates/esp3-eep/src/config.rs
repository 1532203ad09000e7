/// Controls how profiles are admitted into a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, every profile is structurally validated on registration.
    pub strict_mode: bool,
    /// Maximum number of profiles held by the registry.
    pub max_profiles: usize,
    /// Maximum bytes allowed per profile file loaded from a directory.
    pub max_profile_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_profiles: 4096,
            max_profile_file_size: 1024 * 1024,
        }
    }
}
