//! Application configuration for manualkit.
//!
//! User config lives at `~/.manualkit/manualkit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ManualKitError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "manualkit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".manualkit";

// ---------------------------------------------------------------------------
// Config structs (matching manualkit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where fragments and their ordering come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where artifacts are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Transducer settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Chunker settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding the XML fragments.
    #[serde(default = "default_xml_dir")]
    pub xml_dir: String,

    /// Fragment order list (one identifier per line).
    #[serde(default = "default_order_file")]
    pub order_file: String,

    /// Pre-built cross-reference table from an earlier run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xref_table: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            xml_dir: default_xml_dir(),
            order_file: default_order_file(),
            xref_table: None,
        }
    }
}

fn default_xml_dir() -> String {
    "./xml".into()
}
fn default_order_file() -> String {
    "./order.txt".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving all artifacts of a run.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Base for rewritten image references (local directory or hosted URL).
    #[serde(default = "default_image_base")]
    pub image_base: String,

    /// Graphic extension found in the source fragments.
    #[serde(default = "default_image_source_ext")]
    pub image_source_ext: String,

    /// Extension the published images carry.
    #[serde(default = "default_image_target_ext")]
    pub image_target_ext: String,

    /// Stylesheet linked from the HTML page artifact.
    #[serde(default = "default_stylesheet")]
    pub stylesheet: String,

    /// `<title>` of the HTML page artifact.
    #[serde(default = "default_document_title")]
    pub document_title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_base: default_image_base(),
            image_source_ext: default_image_source_ext(),
            image_target_ext: default_image_target_ext(),
            stylesheet: default_stylesheet(),
            document_title: default_document_title(),
        }
    }
}

fn default_image_base() -> String {
    "./graphics/png/".into()
}
fn default_image_source_ext() -> String {
    "eps".into()
}
fn default_image_target_ext() -> String {
    "png".into()
}
fn default_stylesheet() -> String {
    "./styles/style.css".into()
}
fn default_document_title() -> String {
    "Documentation".into()
}

/// Chunking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkPolicy {
    /// Structure-aware cutting that keeps lists, paragraphs and tables whole.
    #[default]
    Balanced,
    /// One chunk per top-level section, byte-sliced when oversized.
    PerSection,
}

impl std::fmt::Display for ChunkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => f.write_str("balanced"),
            Self::PerSection => f.write_str("per-section"),
        }
    }
}

impl std::str::FromStr for ChunkPolicy {
    type Err = ManualKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "balanced" => Ok(Self::Balanced),
            "per-section" => Ok(Self::PerSection),
            other => Err(ManualKitError::config(format!(
                "unknown chunk policy '{other}': expected 'balanced' or 'per-section'"
            ))),
        }
    }
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Which policy to apply.
    #[serde(default)]
    pub policy: ChunkPolicy,

    /// Minimum length before a structural boundary is taken.
    #[serde(default = "default_preferred_len")]
    pub preferred_len: usize,

    /// Past this length a cut may follow any matched structural close.
    #[serde(default = "default_soft_ceiling")]
    pub soft_ceiling: usize,

    /// No chunk may exceed this length.
    #[serde(default = "default_hard_ceiling")]
    pub hard_ceiling: usize,

    /// Upper bound of the context carried over from the previous chunk.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Per-section policy: sections up to this length are emitted whole.
    #[serde(default = "default_section_max")]
    pub section_max: usize,

    /// Tags whose open/close pairs must balance before a preferred cut.
    #[serde(default = "default_structural_tags")]
    pub structural_tags: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            policy: ChunkPolicy::default(),
            preferred_len: default_preferred_len(),
            soft_ceiling: default_soft_ceiling(),
            hard_ceiling: default_hard_ceiling(),
            overlap: default_overlap(),
            section_max: default_section_max(),
            structural_tags: default_structural_tags(),
        }
    }
}

impl ChunkingConfig {
    /// Check the tiered ceilings are ordered and usable.
    pub fn validate(&self) -> Result<()> {
        if self.preferred_len == 0 || self.hard_ceiling == 0 || self.section_max == 0 {
            return Err(ManualKitError::config(
                "chunk lengths must be greater than zero",
            ));
        }
        if self.preferred_len > self.soft_ceiling || self.soft_ceiling > self.hard_ceiling {
            return Err(ManualKitError::config(format!(
                "chunk ceilings out of order: preferred_len {} <= soft_ceiling {} <= hard_ceiling {} required",
                self.preferred_len, self.soft_ceiling, self.hard_ceiling
            )));
        }
        if self.overlap >= self.hard_ceiling {
            return Err(ManualKitError::config(format!(
                "overlap {} must be smaller than hard_ceiling {}",
                self.overlap, self.hard_ceiling
            )));
        }
        Ok(())
    }
}

fn default_preferred_len() -> usize {
    1000
}
fn default_soft_ceiling() -> usize {
    2000
}
fn default_hard_ceiling() -> usize {
    3000
}
fn default_overlap() -> usize {
    300
}
fn default_section_max() -> usize {
    27000
}
fn default_structural_tags() -> Vec<String> {
    ["ol", "ul", "p", "table"].map(String::from).to_vec()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.manualkit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ManualKitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.manualkit/manualkit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ManualKitError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ManualKitError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.chunking.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ManualKitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ManualKitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ManualKitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("xml_dir"));
        assert!(toml_str.contains("hard_ceiling"));
        assert!(toml_str.contains("policy = \"balanced\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chunking.hard_ceiling, 3000);
        assert_eq!(parsed.render.image_target_ext, "png");
        assert_eq!(parsed.chunking.structural_tags, vec!["ol", "ul", "p", "table"]);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
xml_dir = "/data/manual/xml"
xref_table = "/data/previous/mapping.csv"

[chunking]
policy = "per-section"
section_max = 5000
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.xml_dir, "/data/manual/xml");
        assert_eq!(config.source.order_file, "./order.txt");
        assert_eq!(config.source.xref_table.as_deref(), Some("/data/previous/mapping.csv"));
        assert_eq!(config.chunking.policy, ChunkPolicy::PerSection);
        assert_eq!(config.chunking.section_max, 5000);
        assert_eq!(config.chunking.overlap, 300);
    }

    #[test]
    fn chunking_validation_rejects_unordered_ceilings() {
        let mut chunking = ChunkingConfig::default();
        assert!(chunking.validate().is_ok());

        chunking.soft_ceiling = 5000;
        let err = chunking.validate().unwrap_err();
        assert!(err.to_string().contains("out of order"));

        let mut chunking = ChunkingConfig::default();
        chunking.overlap = chunking.hard_ceiling;
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn policy_parses_from_str() {
        assert_eq!("balanced".parse::<ChunkPolicy>().unwrap(), ChunkPolicy::Balanced);
        assert_eq!("per-section".parse::<ChunkPolicy>().unwrap(), ChunkPolicy::PerSection);
        assert!("pages".parse::<ChunkPolicy>().is_err());
        assert_eq!(ChunkPolicy::PerSection.to_string(), "per-section");
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/definitely/not/here/manualkit.toml")).unwrap_err();
        assert!(matches!(err, ManualKitError::Io { .. }));
    }
}
