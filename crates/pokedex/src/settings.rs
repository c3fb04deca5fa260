use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use reqwest::Url;
use resource_cache::CacheConfig;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::source::DEFAULT_URL;

/// The name of the configuration file.
pub const CONFIG_RC_FILE_NAME: &str = ".pokedexrc";

/// Fetches that settle faster than this never show the loading message.
pub const DEFAULT_BUSY_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Outputs a detailed description of each pokemon.
    #[default]
    Pretty,
    /// Outputs each pokemon as a table.
    Compact,
    /// Outputs each pokemon as JSON.
    Json,
}

/// Looks up pokemon by name, with a cache of recently viewed pokemon.
///
/// Pokemon can be given as arguments. Without arguments, names are read line by line from
/// stdin and an empty line resets the selection.
///
/// Settings are read from `~/.pokedexrc` and a `.pokedexrc` or `pokedex.toml` in the
/// current directory or any of its parents, or from the file given with `--config`.
#[derive(Clone, Parser, Debug)]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// The pokemon to look up.
    pub names: Vec<String>,

    /// The configuration file to use instead of the default locations.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// The URL of the pokemon API.
    ///
    /// Defaults to `https://pokeapi.co/api/v2/`.
    #[arg(long)]
    pub url: Option<String>,

    /// How long a pokemon stays cached after it was last looked up, e.g. `5s` or `1m`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub cache_time: Option<Duration>,

    /// How long to wait for a pokemon before showing the loading message, e.g. `300ms`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub busy_delay: Option<Duration>,

    /// The output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// The severity level of logging output.
    ///
    /// Possible values:
    /// off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    pub url: Option<String>,
    pub format: Option<OutputFormat>,
    pub cache: Option<CacheConfig>,
    #[serde(with = "humantime_serde")]
    pub busy_delay: Option<Duration>,
}

impl ConfigFile {
    pub fn parse(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(buf) => Self::from_toml(&buf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Configuration file not found");
                Ok(Self::default())
            }
            Err(e) => Err(e).context(format!(
                "Could not read configuration file at {}",
                path.display()
            )),
        }
    }

    fn from_toml(buf: &str) -> Result<Self> {
        toml::from_str(buf).context("Could not parse configuration file")
    }

    /// Fills in everything that is not set in `self` from `other`.
    fn or(self, other: Self) -> Self {
        Self {
            url: self.url.or(other.url),
            format: self.format.or(other.format),
            cache: self.cache.or(other.cache),
            busy_delay: self.busy_delay.or(other.busy_delay),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub names: Vec<String>,
    pub base_url: Url,
    pub output_format: OutputFormat,
    pub cache: CacheConfig,
    /// Grace period before a pending pokemon shows the loading message.
    pub busy_delay: Duration,
}

impl Settings {
    /// Resolves the settings from the command line and the configuration files.
    pub fn get(cli: Cli) -> Result<Self> {
        let config_file = match &cli.config {
            Some(path) => ConfigFile::parse(path)?,
            None => {
                let global_config_path = find_global_config_file()?;
                let global_config_file = if global_config_path.exists() {
                    ConfigFile::parse(&global_config_path)?
                } else {
                    ConfigFile::default()
                };
                let project_config_file = match find_project_config_file() {
                    Some(path) if path != global_config_path => ConfigFile::parse(&path)?,
                    _ => ConfigFile::default(),
                };
                project_config_file.or(global_config_file)
            }
        };

        Self::resolve(cli, config_file)
    }

    fn resolve(cli: Cli, config_file: ConfigFile) -> Result<Self> {
        let url = cli
            .url
            .as_deref()
            .or(config_file.url.as_deref())
            .unwrap_or(DEFAULT_URL);
        let base_url = Url::parse(url).context("Invalid pokemon API URL")?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid pokemon API URL: {base_url} cannot be used as a base URL");
        }

        let mut cache = config_file.cache.unwrap_or_default();
        if let Some(cache_time) = cli.cache_time {
            cache.ttl = cache_time;
        }

        let names = cli
            .names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Settings {
            names,
            base_url,
            output_format: cli.format.or(config_file.format).unwrap_or_default(),
            cache,
            busy_delay: cli
                .busy_delay
                .or(config_file.busy_delay)
                .unwrap_or(DEFAULT_BUSY_DELAY),
        })
    }
}

fn find_global_config_file() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home dir"))
        .map(|mut path| {
            path.push(CONFIG_RC_FILE_NAME);
            path
        })
}

fn find_project_config_file() -> Option<PathBuf> {
    std::env::current_dir().ok().and_then(|mut path| {
        loop {
            path.push(CONFIG_RC_FILE_NAME);
            if path.exists() {
                return Some(path);
            }
            path.set_file_name("pokedex.toml");
            if path.exists() {
                return Some(path);
            }
            path.pop();
            if !path.pop() {
                return None;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pokedex").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(cli(&[]), ConfigFile::default()).unwrap();

        assert!(settings.names.is_empty());
        assert_eq!(settings.base_url.as_str(), DEFAULT_URL);
        assert_eq!(settings.output_format, OutputFormat::Pretty);
        assert_eq!(settings.cache, CacheConfig::default());
        assert_eq!(settings.busy_delay, DEFAULT_BUSY_DELAY);
    }

    #[test]
    fn test_config_file() {
        let toml = r#"
            url = "http://localhost:8000/api/v2/"
            format = "json"
            busy_delay = "1s"

            [cache]
            ttl = "1m"
            sweep_interval = "10s"
        "#;
        let config_file = ConfigFile::from_toml(toml).unwrap();
        let settings =
            Settings::resolve(cli(&["Pikachu", "  ", " eevee "]), config_file).unwrap();

        assert_eq!(settings.names, vec!["Pikachu", "eevee"]);
        assert_eq!(settings.base_url.as_str(), "http://localhost:8000/api/v2/");
        assert_eq!(settings.output_format, OutputFormat::Json);
        assert_eq!(settings.cache.ttl, Duration::from_secs(60));
        assert_eq!(settings.cache.sweep_interval, Duration::from_secs(10));
        assert_eq!(settings.busy_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let toml = r#"
            url = "http://localhost:8000/api/v2/"
            format = "json"

            [cache]
            sweep_interval = "2s"
        "#;
        let config_file = ConfigFile::from_toml(toml).unwrap();
        let args = [
            "--url",
            "http://pokeapi.test/",
            "--format",
            "compact",
            "--cache-time",
            "30s",
            "--busy-delay",
            "0s",
            "--log-level",
            "debug",
        ];
        let cli = cli(&args);
        assert_eq!(cli.log_level, LevelFilter::DEBUG);

        let settings = Settings::resolve(cli, config_file).unwrap();
        assert_eq!(settings.base_url.as_str(), "http://pokeapi.test/");
        assert_eq!(settings.output_format, OutputFormat::Compact);
        assert_eq!(settings.cache.ttl, Duration::from_secs(30));
        assert_eq!(settings.cache.sweep_interval, Duration::from_secs(2));
        assert_eq!(settings.busy_delay, Duration::ZERO);
    }

    #[test]
    fn test_project_config_takes_precedence() {
        let project = ConfigFile::from_toml(r#"format = "compact""#).unwrap();
        let global = ConfigFile::from_toml(
            r#"
            format = "json"
            url = "http://global.test/"
        "#,
        )
        .unwrap();

        let merged = project.or(global);
        assert_eq!(merged.format, Some(OutputFormat::Compact));
        assert_eq!(merged.url.as_deref(), Some("http://global.test/"));
        assert!(merged.cache.is_none());
    }

    #[test]
    fn test_invalid_settings() {
        assert!(ConfigFile::from_toml("format = \"yaml\"").is_err());
        assert!(ConfigFile::from_toml("[cache]\nttl = \"forever\"").is_err());

        let result = Settings::resolve(cli(&["--url", "not a url"]), ConfigFile::default());
        assert!(result.is_err());
        let result = Settings::resolve(
            cli(&["--url", "mailto:ash@pallet.town"]),
            ConfigFile::default(),
        );
        assert!(result.is_err());

        assert!(Cli::try_parse_from(["pokedex", "--cache-time", "soon"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let config_file = ConfigFile::parse(Path::new("/this/does/not/exist/.pokedexrc")).unwrap();
        assert!(config_file.url.is_none());
    }
}
