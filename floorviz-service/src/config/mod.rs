use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Model the generation requests are sent to unless overridden.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct FloorvizConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Credential for the generative-image API. `None` is tolerated at
    /// startup (a warning is logged); live generation calls then fail.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model for floor-replacement image generation.
    pub image_model: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bypass the external API and echo the room image back.
    pub mock_mode: bool,
    /// Additional allowed CORS origin for a deployed frontend.
    pub frontend_url: Option<String>,
}

impl FloorvizConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(FloorvizConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: env::var("NANO_BANANA_API_KEY")
                    .ok()
                    .filter(|key| !key.is_empty()),
            },
            models: ModelConfig {
                image_model: get_env("FLOORVIZ_IMAGE_MODEL", Some(DEFAULT_IMAGE_MODEL), is_prod)?,
            },
            server: ServerConfig {
                mock_mode: get_env("MOCK_MODE", Some("false"), is_prod)?
                    .eq_ignore_ascii_case("true"),
                frontend_url: env::var("FRONTEND_URL").ok().filter(|url| !url.is_empty()),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
