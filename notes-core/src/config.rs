use std::sync::OnceLock;

use serde::Deserialize;

use crate::notes::ImageStorage;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub image_storage: ImageStorage,
}

fn default_database_url() -> String {
    "notes.db".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            log_json: false,
            image_storage: ImageStorage::default(),
        }
    }
}

impl Config {
    /// Reads `NOTES_*` variables, loading `.env` first when present.
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Any malformed variable fails the whole read; nothing falls back to a default.
    pub fn from_vars<I>(vars: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed("NOTES_").from_iter::<_, Self>(vars)?;

        Ok(config)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> crate::Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;

    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
pub fn config_override<F>(override_config: F) -> &'static Config
where
    F: FnOnce(Config) -> Config,
{
    CONFIG.get_or_init(|| override_config(Config::default()))
}
