use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("preferences error: {0}")]
    Preferences(#[from] stow_defaults::PrefsError),

    #[error("the global registry is already initialized")]
    AlreadyInstalled,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
