//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template if missing (unless WORKFLOW_COURIER_CONFIG is set).
//!
//! Unknown XML fields are a hard error so misconfigurations surface early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::{Deserialize, Deserializer};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::HTTP_BASE_DEFAULT;
use super::paths::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, ConflictPolicy, LogLevel};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config", deny_unknown_fields)]
struct XmlConfig {
    http_base: Option<String>,
    ws_url: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    use_websocket: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    availability_ttl_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    default_timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    move_timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    copy_file_timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    copy_directory_timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    load_timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    fallback_timeout_ms: Option<u64>,
    on_conflict: Option<String>,
    current_directory: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    strict_documents: Option<bool>,
}

fn trimmed_nonempty(opt: Option<String>) -> Option<String> {
    opt.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// Millisecond fields may carry whitespace around the number.
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    trimmed_nonempty(opt)
        .map(|s| s.parse::<u64>().map_err(serde::de::Error::custom))
        .transpose()
}

fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    trimmed_nonempty(opt)
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid boolean '{other}'"))),
        })
        .transpose()
}

/// Outcome of the startup config lookup.
#[derive(Debug)]
pub enum LoadResult {
    /// File found and parsed.
    Loaded(Config, PathBuf),
    /// No file at the default location; a template was written there.
    CreatedTemplate(PathBuf),
    /// No file and no template (e.g. the template could not be written).
    Defaults,
}

// Map XmlConfig onto defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();
    let ms = Duration::from_millis;

    if let Some(base) = trimmed_nonempty(parsed.http_base) {
        cfg.http_base = base;
    }
    cfg.ws_url = trimmed_nonempty(parsed.ws_url);
    if let Some(flag) = parsed.use_websocket {
        cfg.use_websocket = flag;
    }
    if let Some(s) = trimmed_nonempty(parsed.log_level) {
        cfg.log_level = s.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    if let Some(s) = trimmed_nonempty(parsed.log_file) {
        cfg.log_file = Some(PathBuf::from(s));
    }
    if let Some(v) = parsed.availability_ttl_ms {
        cfg.availability_ttl = ms(v);
    }
    if let Some(v) = parsed.default_timeout_ms {
        cfg.timeouts.default = ms(v);
    }
    if let Some(v) = parsed.move_timeout_ms {
        cfg.timeouts.move_op = ms(v);
    }
    if let Some(v) = parsed.copy_file_timeout_ms {
        cfg.timeouts.copy_file = ms(v);
    }
    if let Some(v) = parsed.copy_directory_timeout_ms {
        cfg.timeouts.copy_directory = ms(v);
    }
    if let Some(v) = parsed.load_timeout_ms {
        cfg.timeouts.load = ms(v);
    }
    if let Some(v) = parsed.fallback_timeout_ms {
        cfg.fallback_timeout = ms(v);
    }
    if let Some(s) = trimmed_nonempty(parsed.on_conflict) {
        cfg.on_conflict = s.parse::<ConflictPolicy>().map_err(anyhow::Error::msg)?;
    }
    cfg.current_directory = trimmed_nonempty(parsed.current_directory);
    if let Some(flag) = parsed.strict_documents {
        cfg.strict_documents = flag;
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in '{}'", path.display()))
}

/// Resolve the config path and load it.
///
/// An explicit `WORKFLOW_COURIER_CONFIG` that points nowhere is an error. A missing file at
/// the default location gets a template.
pub fn load_or_init() -> Result<LoadResult> {
    let explicit = env::var_os(CONFIG_ENV).is_some();
    let path = default_config_path()?;

    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }
    if explicit {
        bail!(
            "config file '{}' (from {CONFIG_ENV}) does not exist",
            path.display()
        );
    }
    match create_template_config(&path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(path)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "template config not written");
            Ok(LoadResult::Defaults)
        }
    }
}

/// Create default template config file and parent directory (best-effort permissions).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "refusing to create config: an ancestor of {} is a symlink",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/workflow_courier.log".into());

    let content = format!(
        "<!--\n  workflow_courier configuration (XML)\n\n  Fields:\n    http_base                  -> base URL of the host (http/https)\n    ws_url                     -> socket URL (ws/wss); empty = derived from http_base\n    use_websocket              -> true | false\n    log_level                  -> quiet | normal | info | debug\n    log_file                   -> path to log file (optional; stderr still used)\n    availability_ttl_ms        -> how long a failed socket is skipped\n    default_timeout_ms, move_timeout_ms, copy_file_timeout_ms,\n    copy_directory_timeout_ms, load_timeout_ms -> socket timeouts per operation\n    fallback_timeout_ms        -> HTTP request timeout\n    on_conflict                -> ask | skip | overwrite | cancel | rename-suffix\n    current_directory          -> known-good host directory for stale path recovery\n    strict_documents           -> reject unrecognized documents on load\n\n  CLI flags override XML values.\n-->\n<config>\n  <http_base>{HTTP_BASE_DEFAULT}</http_base>\n  <ws_url></ws_url>\n  <use_websocket>true</use_websocket>\n  <log_level>normal</log_level>\n  <log_file>{suggested_log}</log_file>\n  <availability_ttl_ms>2000</availability_ttl_ms>\n  <default_timeout_ms>5000</default_timeout_ms>\n  <move_timeout_ms>1500</move_timeout_ms>\n  <copy_file_timeout_ms>8000</copy_file_timeout_ms>\n  <copy_directory_timeout_ms>5000</copy_directory_timeout_ms>\n  <load_timeout_ms>10000</load_timeout_ms>\n  <fallback_timeout_ms>30000</fallback_timeout_ms>\n  <on_conflict>ask</on_conflict>\n  <strict_documents>false</strict_documents>\n</config>\n"
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn load(xml: &str) -> Result<Config> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(&path, xml).unwrap();
        load_config_from_xml_path(&path)
    }

    #[test]
    fn template_parses_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(cfg.http_base, defaults.http_base);
        assert_eq!(cfg.ws_url, None);
        assert_eq!(cfg.timeouts, defaults.timeouts);
        assert_eq!(cfg.availability_ttl, defaults.availability_ttl);
        assert_eq!(cfg.on_conflict, ConflictPolicy::Ask);
    }

    #[test]
    fn whitespace_around_numbers_is_tolerated() {
        let cfg = load("<config><move_timeout_ms>\n  750  \n</move_timeout_ms></config>").unwrap();
        assert_eq!(cfg.timeouts.move_op, Duration::from_millis(750));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let err = load("<config><retry_count>3</retry_count></config>").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(load("<config><on_conflict>maybe</on_conflict></config>").is_err());
        assert!(load("<config><load_timeout_ms>soon</load_timeout_ms></config>").is_err());
        assert!(load("<config><use_websocket>perhaps</use_websocket></config>").is_err());
    }

    #[test]
    fn fields_map_onto_config() {
        let cfg = load(
            "<config><http_base> http://box:9000 </http_base><use_websocket>false</use_websocket>\
             <on_conflict>rename-suffix</on_conflict><strict_documents>true</strict_documents>\
             <current_directory>/w/flows</current_directory></config>",
        )
        .unwrap();
        assert_eq!(cfg.http_base, "http://box:9000");
        assert!(!cfg.use_websocket);
        assert_eq!(cfg.on_conflict, ConflictPolicy::RenameSuffix);
        assert!(cfg.strict_documents);
        assert_eq!(cfg.current_directory.as_deref(), Some("/w/flows"));
    }
}
