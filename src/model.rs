use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "equilibria.yaml";
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IntroStep {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_intro_delay_ms")]
    pub intro_delay_ms: u64,
    // Delay between "Try now" closing the intro and the panel opening
    #[serde(default = "default_try_now_delay_ms")]
    pub try_now_delay_ms: u64,
    // Flag store location; defaults to <state dir>/state.json
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub log_file: Option<String>,
    // External command producing assistant replies (JSON {"reply": ...} or plain text)
    #[serde(default)]
    pub responder_cmd: Option<String>,
    #[serde(default = "default_intro_steps")]
    pub intro_steps: Vec<IntroStep>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            intro_delay_ms: default_intro_delay_ms(),
            try_now_delay_ms: default_try_now_delay_ms(),
            storage_path: None,
            log_file: None,
            responder_cmd: None,
            intro_steps: default_intro_steps(),
        }
    }
}

impl AppConfig {
    pub fn intro_delay(&self) -> Duration {
        Duration::from_millis(self.intro_delay_ms)
    }

    pub fn try_now_delay(&self) -> Duration {
        Duration::from_millis(self.try_now_delay_ms)
    }
}

fn default_assistant_name() -> String {
    "BriLow".to_string()
}

fn default_intro_delay_ms() -> u64 {
    crate::chat_core::coordinator::DEFAULT_INTRO_DELAY.as_millis() as u64
}

fn default_try_now_delay_ms() -> u64 {
    300
}

fn default_intro_steps() -> Vec<IntroStep> {
    vec![
        IntroStep {
            title: "Smart Assistance".into(),
            description: "Get help with any feature or question about Equilibria".into(),
        },
        IntroStep {
            title: "Quick Access".into(),
            description: "Use Ctrl+K to open BriLow instantly from anywhere".into(),
        },
        IntroStep {
            title: "Context Aware".into(),
            description: "BriLow understands which page you're on and provides relevant help"
                .into(),
        },
    ]
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.assistant_name.trim().is_empty() {
        return Err("assistant_name must not be empty".to_string());
    }
    if cfg.intro_steps.is_empty() {
        return Err("intro_steps must contain at least one step".to_string());
    }
    for (i, step) in cfg.intro_steps.iter().enumerate() {
        if step.title.trim().is_empty() {
            return Err(format!("intro step at index {i} has an empty title"));
        }
    }
    for (name, ms) in [
        ("intro_delay_ms", cfg.intro_delay_ms),
        ("try_now_delay_ms", cfg.try_now_delay_ms),
    ] {
        if ms > MAX_DELAY_MS {
            return Err(format!("{name} too large: {ms} (max {MAX_DELAY_MS})"));
        }
    }
    if let Some(cmd) = &cfg.responder_cmd {
        if cmd.trim().is_empty() {
            return Err("responder_cmd is set but empty".to_string());
        }
    }
    Ok(())
}

fn parse_config_file(p: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(p).with_context(|| format!("reading {p:?}"))?;
    let cfg: AppConfig = serde_yaml::from_str(&s).with_context(|| format!("parsing {p:?}"))?;
    validate_app_config(&cfg).map_err(|e| anyhow::anyhow!("invalid config {p:?}: {e}"))?;
    Ok(cfg)
}

/// Locate `equilibria.yaml`.
/// 1) `$EQUILIBRIA_TUI_CONFIG_DIR/equilibria.yaml` (must exist when the var is set)
/// 2) CWD and CWD/.tui
/// 3) ~/.tui
pub fn find_config_path() -> Result<Option<PathBuf>> {
    if let Ok(base) = std::env::var("EQUILIBRIA_TUI_CONFIG_DIR") {
        let entry = PathBuf::from(&base).join(CONFIG_FILE);
        if !entry.exists() {
            anyhow::bail!("EQUILIBRIA_TUI_CONFIG_DIR is set but {entry:?} does not exist");
        }
        return Ok(Some(entry));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut candidates = vec![cwd.join(CONFIG_FILE), cwd.join(".tui").join(CONFIG_FILE)];
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        candidates.push(home.join(".tui").join(CONFIG_FILE));
    }
    Ok(candidates.into_iter().find(|p| p.exists()))
}

/// Load the config, falling back to defaults when no file exists.
/// A file that exists but does not parse is an error.
pub fn load_config() -> Result<(AppConfig, Option<PathBuf>)> {
    match find_config_path()? {
        Some(p) => Ok((parse_config_file(&p)?, Some(p))),
        None => Ok((AppConfig::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.assistant_name, "BriLow");
        assert_eq!(cfg.intro_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.try_now_delay(), Duration::from_millis(300));
        assert_eq!(cfg.intro_steps.len(), 3);
        assert!(validate_app_config(&cfg).is_ok());
    }

    #[test]
    fn yaml_overrides_fields() {
        let yaml = r#"
assistant_name: Penny
intro_delay_ms: 10
responder_cmd: "helper --json"
intro_steps:
  - title: One
    description: First
"#;
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.assistant_name, "Penny");
        assert_eq!(cfg.intro_delay_ms, 10);
        assert_eq!(cfg.responder_cmd.as_deref(), Some("helper --json"));
        assert_eq!(
            cfg.intro_steps,
            vec![IntroStep {
                title: "One".into(),
                description: "First".into()
            }]
        );
    }

    #[test]
    fn validate_rejects_empty_steps() {
        let cfg = AppConfig {
            intro_steps: vec![],
            ..Default::default()
        };
        let err = validate_app_config(&cfg).unwrap_err();
        assert!(err.contains("at least one step"));
    }

    #[test]
    fn validate_rejects_blank_responder() {
        let cfg = AppConfig {
            responder_cmd: Some("  ".into()),
            ..Default::default()
        };
        assert!(validate_app_config(&cfg).unwrap_err().contains("responder_cmd"));
    }

    #[test]
    fn validate_bounds_both_delays() {
        let cfg = AppConfig {
            try_now_delay_ms: 60_001,
            ..Default::default()
        };
        assert!(validate_app_config(&cfg).unwrap_err().contains("try_now_delay_ms"));
        let cfg = AppConfig {
            intro_delay_ms: 60_001,
            ..Default::default()
        };
        assert!(validate_app_config(&cfg).unwrap_err().contains("intro_delay_ms"));
        let cfg = AppConfig {
            try_now_delay_ms: 60_000,
            ..Default::default()
        };
        assert!(validate_app_config(&cfg).is_ok());
    }

    #[test]
    fn parse_config_file_reports_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join(CONFIG_FILE);
        fs::write(&p, "intro_delay_ms: [not, a, number]").unwrap();
        let err = parse_config_file(&p).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
