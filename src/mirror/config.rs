use crate::mirror::clock::DisplayZone;
use crate::mirror::index::{ChatKind, NameMatch};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorArchiveConfig {
    pub name_match: String,
    pub escape_markup: bool,
    pub chat_kind: String,
    pub utc_offset: String,
    pub timezone: Option<String>,
    pub index_template: Option<String>,
}

impl Default for MirrorArchiveConfig {
    fn default() -> Self {
        Self {
            name_match: "exact".to_string(),
            escape_markup: true,
            chat_kind: "private".to_string(),
            utc_offset: "+00:00".to_string(),
            timezone: None,
            index_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorWatcherConfig {
    pub poll_interval_secs: u64,
}

impl Default for MirrorWatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorInboundConfig {
    pub enabled: bool,
    pub recursive: bool,
    pub watch_paths: Vec<String>,
}

impl Default for MirrorInboundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recursive: false,
            watch_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorLoggingConfig {
    pub level: String,
}

impl Default for MirrorLoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MirrorConfig {
    pub archive: MirrorArchiveConfig,
    pub watcher: MirrorWatcherConfig,
    pub inbound: MirrorInboundConfig,
    pub logging: MirrorLoggingConfig,
}

impl MirrorConfig {
    pub fn name_match(&self) -> Result<NameMatch> {
        self.archive.name_match.parse()
    }

    pub fn chat_kind(&self) -> Result<ChatKind> {
        self.archive.chat_kind.parse()
    }

    /// A named timezone wins over the fixed offset.
    pub fn display_zone(&self) -> Result<DisplayZone> {
        match self.archive.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => DisplayZone::named(name),
            _ => DisplayZone::fixed(&self.archive.utc_offset),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMirrorConfig {
    archive: Option<MirrorArchiveConfig>,
    watcher: Option<MirrorWatcherConfig>,
    inbound: Option<MirrorInboundConfig>,
    logging: Option<MirrorLoggingConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_optional_string(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => fallback,
    }
}

fn env_or_csv_paths(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

pub fn validate(cfg: &MirrorConfig) -> Result<()> {
    cfg.name_match()?;
    cfg.chat_kind()?;
    cfg.display_zone()?;
    if cfg.watcher.poll_interval_secs == 0 {
        return Err(anyhow!(
            "invalid watcher poll interval: must be >= 1 second"
        ));
    }
    if cfg.logging.level.trim().is_empty() {
        return Err(anyhow!("invalid logging level: cannot be empty"));
    }
    if let Some(template) = &cfg.archive.index_template
        && template.trim().is_empty()
    {
        return Err(anyhow!("invalid index template path: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("MIRROR_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    Some(dirs::config_dir()?.join("chat-mirror").join("config.toml"))
}

fn merge_file_config(base: &mut MirrorConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse mirror config {}: {err}", path.display()))
}

fn merge_toml(base: &mut MirrorConfig, raw: &str) -> Result<()> {
    let parsed: PartialMirrorConfig = toml::from_str(raw)?;
    if let Some(archive) = parsed.archive {
        base.archive = archive;
    }
    if let Some(watcher) = parsed.watcher {
        base.watcher = watcher;
    }
    if let Some(inbound) = parsed.inbound {
        base.inbound = inbound;
    }
    if let Some(logging) = parsed.logging {
        base.logging = logging;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut MirrorConfig) {
    cfg.archive.name_match = env_or_string("MIRROR_NAME_MATCH", &cfg.archive.name_match);
    cfg.archive.escape_markup = env_or_bool("MIRROR_ESCAPE_MARKUP", cfg.archive.escape_markup);
    cfg.archive.chat_kind = env_or_string("MIRROR_CHAT_KIND", &cfg.archive.chat_kind);
    cfg.archive.utc_offset = env_or_string("MIRROR_UTC_OFFSET", &cfg.archive.utc_offset);
    cfg.archive.timezone =
        env_or_optional_string("MIRROR_TIMEZONE", cfg.archive.timezone.take());
    cfg.archive.index_template =
        env_or_optional_string("MIRROR_INDEX_TEMPLATE", cfg.archive.index_template.take());
    cfg.watcher.poll_interval_secs =
        env_or_u64("MIRROR_POLL_INTERVAL_SECS", cfg.watcher.poll_interval_secs);
    cfg.inbound.enabled = env_or_bool("MIRROR_INBOUND_ENABLED", cfg.inbound.enabled);
    cfg.inbound.recursive = env_or_bool("MIRROR_INBOUND_RECURSIVE", cfg.inbound.recursive);
    cfg.inbound.watch_paths = env_or_csv_paths("MIRROR_INBOUND_PATHS", &cfg.inbound.watch_paths);
    cfg.logging.level = env_or_string("MIRROR_LOG_LEVEL", &cfg.logging.level);
}

pub fn load_config() -> Result<MirrorConfig> {
    let mut cfg = MirrorConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = MirrorConfig::default();
        validate(&cfg).expect("defaults are valid");
        assert_eq!(cfg.name_match().expect("match"), NameMatch::Exact);
        assert_eq!(cfg.chat_kind().expect("kind"), ChatKind::Private);
    }

    #[test]
    fn file_sections_replace_defaults_individually() {
        let mut cfg = MirrorConfig::default();
        merge_toml(
            &mut cfg,
            r#"
[archive]
name_match = "contains"
chat_kind = "group"
utc_offset = "+03:00"

[watcher]
poll_interval_secs = 30
"#,
        )
        .expect("merge");

        assert_eq!(cfg.name_match().expect("match"), NameMatch::Contains);
        assert_eq!(cfg.chat_kind().expect("kind"), ChatKind::Group);
        assert!(cfg.archive.escape_markup);
        assert_eq!(cfg.watcher.poll_interval_secs, 30);
        assert!(cfg.inbound.enabled);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn rejects_unknown_name_match_and_zero_interval() {
        let mut cfg = MirrorConfig::default();
        cfg.archive.name_match = "fuzzy".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = MirrorConfig::default();
        cfg.watcher.poll_interval_secs = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn named_timezone_overrides_offset() {
        let mut cfg = MirrorConfig::default();
        cfg.archive.utc_offset = "+05:00".to_string();
        cfg.archive.timezone = Some("Europe/Moscow".to_string());
        assert!(matches!(
            cfg.display_zone().expect("zone"),
            DisplayZone::Named(_)
        ));

        cfg.archive.timezone = Some("Mars/Olympus".to_string());
        assert!(cfg.display_zone().is_err());
    }
}
