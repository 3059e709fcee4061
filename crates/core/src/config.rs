use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::campaign::{ButtonStyle, Customization};

pub const DEFAULT_CONFIG_FILE: &str = "vireo.toml";
pub const DEFAULT_DATA_FILE: &str = "campaigns.json";
pub const DEFAULT_LOGO_URL: &str = "https://via.placeholder.com/64x64/4CAF50/FFFFFF?text=V";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub branding: BrandingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    /// Informational only; serenity reads the application id from the gateway.
    pub application_id: Option<String>,
    /// Registers commands on this guild instead of globally when set.
    pub guild_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

/// Defaults applied to every announcement unless `/create-campaign` overrides them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrandingConfig {
    pub embed_title: String,
    pub footer_text: String,
    pub button_text: String,
    pub button_emoji: String,
    pub button_style: ButtonStyle,
    pub embed_color: String,
    pub logo_url: Option<String>,
}

impl BrandingConfig {
    pub fn customization_for(&self, category_name: String) -> Customization {
        Customization {
            button_text: self.button_text.clone(),
            button_emoji: self.button_emoji.clone(),
            button_style: self.button_style,
            embed_color: self.embed_color.clone(),
            embed_title: self.embed_title.clone(),
            footer_text: self.footer_text.clone(),
            category_name,
            logo_url: self.logo_url.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub guild_id: Option<String>,
    pub data_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                application_id: None,
                guild_id: None,
            },
            storage: StorageConfig { data_file: PathBuf::from(DEFAULT_DATA_FILE) },
            branding: BrandingConfig {
                embed_title: "🎯 Vireo Opportunities".to_owned(),
                footer_text: "Powered by Vireo".to_owned(),
                button_text: "Start Clipping".to_owned(),
                button_emoji: "🎬".to_owned(),
                button_style: ButtonStyle::Success,
                embed_color: "4CAF50".to_owned(),
                logo_url: Some(DEFAULT_LOGO_URL.to_owned()),
            },
            logging: LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact },
        }
    }
}

/// Trims whitespace and quotes and drops a pasted `Bot ` prefix.
pub fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|ch| ch == '"' || ch == '\'').trim();
    trimmed.strip_prefix("Bot ").unwrap_or(trimmed).trim().to_owned()
}

fn secret_token(raw: &str) -> SecretString {
    normalize_token(raw).into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn bot_token(&self) -> &str {
        self.discord.bot_token.expose_secret()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_token(&bot_token_value);
            }
            if let Some(application_id) = discord.application_id {
                self.discord.application_id = Some(application_id);
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = Some(guild_id);
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(data_file) = storage.data_file {
                self.storage.data_file = data_file;
            }
        }

        if let Some(branding) = patch.branding {
            if let Some(embed_title) = branding.embed_title {
                self.branding.embed_title = embed_title;
            }
            if let Some(footer_text) = branding.footer_text {
                self.branding.footer_text = footer_text;
            }
            if let Some(button_text) = branding.button_text {
                self.branding.button_text = button_text;
            }
            if let Some(button_emoji) = branding.button_emoji {
                self.branding.button_emoji = button_emoji;
            }
            if let Some(button_style) = branding.button_style {
                self.branding.button_style = parse_button_style("branding.button_style", &button_style)?;
            }
            if let Some(embed_color) = branding.embed_color {
                self.branding.embed_color = embed_color;
            }
            if let Some(logo_url) = branding.logo_url {
                self.branding.logo_url = Some(logo_url).filter(|url| !url.trim().is_empty());
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Bare names are what older deployments put in `.env`.
        if let Some(value) = read_env("VIREO_DISCORD_BOT_TOKEN").or_else(|| read_env("BOT_TOKEN")) {
            self.discord.bot_token = secret_token(&value);
        }
        if let Some(value) =
            read_env("VIREO_DISCORD_APPLICATION_ID").or_else(|| read_env("CLIENT_ID"))
        {
            self.discord.application_id = Some(value);
        }
        if let Some(value) = read_env("VIREO_DISCORD_GUILD_ID").or_else(|| read_env("GUILD_ID")) {
            self.discord.guild_id = Some(value);
        }

        if let Some(value) = read_env("VIREO_STORAGE_DATA_FILE") {
            self.storage.data_file = PathBuf::from(value);
        }

        if let Some(value) = read_env("VIREO_BRANDING_EMBED_TITLE") {
            self.branding.embed_title = value;
        }
        if let Some(value) = read_env("VIREO_BRANDING_FOOTER_TEXT") {
            self.branding.footer_text = value;
        }
        if let Some(value) = read_env("VIREO_BRANDING_BUTTON_TEXT") {
            self.branding.button_text = value;
        }
        if let Some(value) = read_env("VIREO_BRANDING_BUTTON_EMOJI") {
            self.branding.button_emoji = value;
        }
        if let Some(value) = read_env("VIREO_BRANDING_BUTTON_STYLE") {
            self.branding.button_style = parse_button_style("VIREO_BRANDING_BUTTON_STYLE", &value)?;
        }
        if let Some(value) = read_env("VIREO_BRANDING_EMBED_COLOR") {
            self.branding.embed_color = value;
        }
        if let Some(value) = read_env("VIREO_BRANDING_LOGO_URL") {
            self.branding.logo_url = Some(value);
        }

        let log_level = read_env("VIREO_LOGGING_LEVEL").or_else(|| read_env("VIREO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("VIREO_LOGGING_FORMAT").or_else(|| read_env("VIREO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = secret_token(&bot_token);
        }
        if let Some(guild_id) = overrides.guild_id {
            self.discord.guild_id = Some(guild_id);
        }
        if let Some(data_file) = overrides.data_file {
            self.storage.data_file = data_file;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_storage(&self.storage)?;
        validate_branding(&self.branding)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.bot_token.expose_secret();
    if token.is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Set BOT_TOKEN (or VIREO_DISCORD_BOT_TOKEN) to the token from https://discord.com/developers/applications > Your App > Bot".to_owned(),
        ));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.bot_token must not contain whitespace; paste only the token itself".to_owned(),
        ));
    }
    // Bot tokens are three dot-separated segments.
    if token.split('.').filter(|segment| !segment.is_empty()).count() != 3 {
        return Err(ConfigError::Validation(
            "discord.bot_token does not look like a bot token (expected three `.`-separated parts)"
                .to_owned(),
        ));
    }

    for (key, value) in
        [("discord.application_id", &discord.application_id), ("discord.guild_id", &discord.guild_id)]
    {
        if let Some(value) = value {
            if value.trim().parse::<u64>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a numeric snowflake id, got `{value}`"
                )));
            }
        }
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.data_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation("storage.data_file must not be empty".to_owned()));
    }
    Ok(())
}

fn validate_branding(branding: &BrandingConfig) -> Result<(), ConfigError> {
    let color = branding.embed_color.trim().trim_start_matches('#');
    if color.len() != 6 || u32::from_str_radix(color, 16).is_err() {
        return Err(ConfigError::Validation(format!(
            "branding.embed_color must be a six digit hex color, got `{}`",
            branding.embed_color
        )));
    }
    if branding.button_text.trim().is_empty() {
        return Err(ConfigError::Validation("branding.button_text must not be empty".to_owned()));
    }
    if let Some(logo_url) = &branding.logo_url {
        if !logo_url.starts_with("http://") && !logo_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "branding.logo_url must start with http:// or https://".to_owned(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_owned(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_button_style(key: &str, value: &str) -> Result<ButtonStyle, ConfigError> {
    value.parse::<ButtonStyle>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    storage: Option<StoragePatch>,
    branding: Option<BrandingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    application_id: Option<String>,
    guild_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    data_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandingPatch {
    embed_title: Option<String>,
    footer_text: Option<String>,
    button_text: Option<String>,
    button_emoji: Option<String>,
    button_style: Option<String>,
    embed_color: Option<String>,
    logo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
