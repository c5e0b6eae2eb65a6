use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("base_url `{url}` is not an absolute url: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("max_drain must be at least 1")]
    ZeroDrain,
}

/// Runtime knobs, usually left at their defaults.
///
/// ```toml
/// log_batches = true
/// strict_handler_removal = true
/// max_drain = 500
/// base_url = "https://example.test/app/"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Log every shipped batch at `info`.
    pub log_batches: bool,
    /// Treat a `RemoveHandler` for an unregistered command as a registry conflict.
    pub strict_handler_removal: bool,
    /// Upper bound of events handled by one `run_until_idle`.
    pub max_drain: usize,
    /// Links under this prefix are in-app; everything else is external. Defaults to the
    /// current url's origin.
    pub base_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_batches: false,
            strict_handler_removal: true,
            max_drain: 10_000,
            base_url: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_drain == 0 {
            return Err(ConfigError::ZeroDrain);
        }
        self.base()?;
        Ok(())
    }

    pub(crate) fn base(&self) -> Result<Option<Url>, ConfigError> {
        self.base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|source| ConfigError::BaseUrl {
                    url: raw.to_string(),
                    source,
                })
            })
            .transpose()
    }
}
