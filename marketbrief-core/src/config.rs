//! Pipeline configuration: the tickers/sources YAML file and secrets.
//!
//! The tickers file lists the instruments tracked per section plus optional
//! tuning blocks. Everything except the instrument lists has a default, so a
//! minimal file is just:
//!
//! ```yaml
//! indian_indices:
//!   - { symbol: "^NSEI", name: "NIFTY 50", chart: true }
//! movers:
//!   universe: [RELIANCE.NS, TCS.NS, INFY.NS]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::symbols;

/// Default location of the tickers file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/tickers.yaml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_VAR: &str = "MARKETBRIEF_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One tracked instrument.
///
/// In YAML either a bare symbol (`RELIANCE.NS`) or a mapping with optional
/// `name` and `chart` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InstrumentRepr")]
pub struct Instrument {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Keep a close history for this instrument and chart it in the report.
    pub chart: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InstrumentRepr {
    Bare(String),
    Full {
        symbol: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        chart: bool,
    },
}

impl From<InstrumentRepr> for Instrument {
    fn from(repr: InstrumentRepr) -> Self {
        match repr {
            InstrumentRepr::Bare(symbol) => Instrument {
                symbol,
                name: None,
                chart: false,
            },
            InstrumentRepr::Full {
                symbol,
                name,
                chart,
            } => Instrument {
                symbol,
                name,
                chart,
            },
        }
    }
}

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        Instrument {
            symbol: symbol.into(),
            name: None,
            chart: false,
        }
    }

    pub fn named(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Instrument {
            symbol: symbol.into(),
            name: Some(name.into()),
            chart: false,
        }
    }

    pub fn charted(mut self) -> Self {
        self.chart = true;
        self
    }

    /// Configured name, then the built-in display name, then the symbol.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => symbols::display_name(&self.symbol)
                .map(str::to_string)
                .unwrap_or_else(|| self.symbol.clone()),
        }
    }
}

/// Equities ranked into top gainers and losers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoversConfig {
    pub universe: Vec<Instrument>,
    pub top_n: usize,
}

impl Default for MoversConfig {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            top_n: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub query: String,
    pub page_size: u32,
    pub language: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            query: "finance".into(),
            page_size: 6,
            language: "en".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmiConfig {
    /// Volatility index the mood reading is derived from.
    pub vix_symbol: String,
}

impl Default for MmiConfig {
    fn default() -> Self {
        Self {
            vix_symbol: "^INDIAVIX".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// Trading days of close history kept for charted instruments.
    pub history_days: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            history_days: 22,
            timeout_secs: 30,
        }
    }
}

/// RGB colour, 0..=255 per channel.
pub type Rgb = [u8; 3];

/// Colours used by report charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub positive: Rgb,
    pub negative: Rgb,
    pub line: Rgb,
    pub header: Rgb,
    pub grid: Rgb,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            positive: [27, 138, 58],
            negative: [200, 40, 40],
            line: [0, 51, 102],
            header: [211, 211, 211],
            grid: [150, 150, 150],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Hard cap on the number of PDF pages.
    pub max_pages: usize,
    pub title: String,
    pub style: ChartStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_pages: 8,
            title: "Financial Market Report".into(),
            style: ChartStyle::default(),
        }
    }
}

/// Output directories, relative to the working directory unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl PathsConfig {
    /// Re-root every relative directory under `root`.
    pub fn rooted_at(&self, root: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        Self {
            raw_dir: join(&self.raw_dir),
            processed_dir: join(&self.processed_dir),
            reports_dir: join(&self.reports_dir),
        }
    }
}

/// The complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub indian_indices: Vec<Instrument>,
    #[serde(default)]
    pub international_indices: Vec<Instrument>,
    #[serde(default)]
    pub currencies: Vec<Instrument>,
    #[serde(default)]
    pub commodities: Vec<Instrument>,
    #[serde(default)]
    pub crypto: Vec<Instrument>,
    #[serde(default)]
    pub movers: MoversConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub mmi: MmiConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl PipelineConfig {
    /// Load and validate a config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("config file {} ({} bytes)", path.display(), content.len());
        Self::from_yaml(&content)
    }

    /// Parse and validate a config from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the tickers file: `$MARKETBRIEF_CONFIG` or the default.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.movers.top_n == 0 {
            return Err(ConfigError::Invalid("movers.top_n must be at least 1".into()));
        }
        if self.report.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "report.max_pages must be at least 1".into(),
            ));
        }
        if self.quotes.history_days < 2 {
            return Err(ConfigError::Invalid(
                "quotes.history_days must be at least 2".into(),
            ));
        }
        if self.mmi.vix_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("mmi.vix_symbol is empty".into()));
        }
        for (section, list) in self.instrument_lists() {
            if let Some(blank) = list.iter().find(|i| i.symbol.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "{section}: blank symbol (name: {:?})",
                    blank.name
                )));
            }
        }
        Ok(())
    }

    /// Every instrument list with its section key.
    pub fn instrument_lists(&self) -> [(&'static str, &[Instrument]); 6] {
        [
            ("indian_indices", self.indian_indices.as_slice()),
            ("international_indices", self.international_indices.as_slice()),
            ("currencies", self.currencies.as_slice()),
            ("commodities", self.commodities.as_slice()),
            ("crypto", self.crypto.as_slice()),
            ("movers", self.movers.universe.as_slice()),
        ]
    }

    /// Total number of tracked instruments.
    pub fn instrument_count(&self) -> usize {
        self.instrument_lists().iter().map(|(_, l)| l.len()).sum()
    }
}

/// API secrets, read from the environment (after `.env` is loaded).
///
/// Never serialized; `Debug` output is redacted.
#[derive(Clone, Default)]
pub struct Secrets {
    news_api_key: Option<String>,
}

impl Secrets {
    pub const NEWS_API_KEY_VAR: &'static str = "NEWSAPI_KEY";

    pub fn from_env() -> Self {
        let news_api_key = std::env::var(Self::NEWS_API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self { news_api_key }
    }

    pub fn with_news_api_key(key: impl Into<String>) -> Self {
        Self {
            news_api_key: Some(key.into()),
        }
    }

    pub fn news_api_key(&self) -> Option<&str> {
        self.news_api_key.as_deref()
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field(
                "news_api_key",
                &self.news_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
