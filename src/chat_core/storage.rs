use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key under which the "intro seen" flag is persisted.
pub const INTRO_SEEN_KEY: &str = "briLowIntroSeen";

/// Minimal durable key-value surface the coordinator needs.
pub trait FlagStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// Process-local store. Used by tests and as the fallback when no
/// durable location can be resolved.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk: `{ "<key>": "<value>", ... }`.
///
/// Every operation re-reads the file so two sessions pointing at the same
/// path observe each other's writes on the next read.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, JsonValue>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("reading flag store {:?}", self.path))?;
        if s.trim().is_empty() {
            return Ok(Map::new());
        }
        let v: JsonValue = serde_json::from_str(&s)
            .with_context(|| format!("parsing flag store {:?}", self.path))?;
        match v {
            JsonValue::Object(map) => Ok(map),
            _ => Err(anyhow!("flag store {:?} is not a JSON object", self.path)),
        }
    }

    fn save(&self, map: &Map<String, JsonValue>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
            }
        }
        let text = serde_json::to_string_pretty(map)?;
        // Write-then-rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).with_context(|| format!("writing {tmp:?}"))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing flag store {:?}", self.path))?;
        Ok(())
    }
}

impl FlagStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let map = self.load()?;
        Ok(map.get(key).map(|v| match v {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        // Unreadable contents are replaced.
        let mut map = match self.load() {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "flag store unreadable; rewriting it");
                Map::new()
            }
        };
        map.insert(key.to_string(), JsonValue::String(value.to_string()));
        self.save(&map)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

/// Resolve the directory holding the flag store and the log file.
/// `EQUILIBRIA_TUI_STATE_DIR` wins, then `~/.equilibria`, then `./.equilibria`.
pub fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EQUILIBRIA_TUI_STATE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        return home.join(".equilibria");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".equilibria")
}

/// Expand a leading `~/` against `HOME` (or `USERPROFILE`).
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
        {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
