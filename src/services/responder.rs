use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::OnceLock;
use std::thread;
use std::{collections::HashMap, env};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ReplyMsg {
    pub id: u64,
    pub outcome: Result<String, String>,
}

fn env_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap())
}

/// Expand `${VAR}` from the environment; unknown vars expand to "".
pub(crate) fn expand_cmdline_env(cmdline: &str) -> String {
    let env_map: HashMap<String, String> = env::vars().collect();
    env_var_re()
        .replace_all(cmdline, |caps: &regex::Captures| {
            env_map.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}

/// Accepts `{"reply": ".."}`, `{"data": {"reply": ".."}}`, a JSON string, or
/// plain text.
pub(crate) fn parse_reply(stdout: &str) -> Option<String> {
    let text = stdout.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<JsonValue>(text) {
        Ok(JsonValue::String(s)) => Some(s).filter(|s| !s.trim().is_empty()),
        Ok(v @ JsonValue::Object(_)) => v
            .get("reply")
            .or_else(|| v.get("data").and_then(|d| d.get("reply")))
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty()),
        Ok(_) => None,
        Err(_) => Some(text.to_string()),
    }
}

/// Run the responder once: prompt on stdin and in `EQUILIBRIA_PROMPT`.
pub fn run_responder(cmdline: &str, prompt: &str) -> Result<String> {
    let expanded = expand_cmdline_env(cmdline);
    let parts = shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    if parts.is_empty() {
        return Err(anyhow!("Empty command line"));
    }
    let mut child = Command::new(&parts[0])
        .args(&parts[1..])
        .env("EQUILIBRIA_PROMPT", prompt)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning {expanded}"))?;
    if let Some(mut stdin) = child.stdin.take() {
        // A responder that ignores stdin may close it early; that is fine.
        let _ = stdin.write_all(prompt.as_bytes());
    }
    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for {expanded}"))?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(anyhow!("Command failed: {}\n{}", cmdline, err.trim()));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    parse_reply(&text).ok_or_else(|| anyhow!("responder returned no reply"))
}

/// Produce a reply off the UI thread and send it back on `tx`.
/// Without a configured command the reply is immediate and local.
pub fn spawn_reply(cmdline: Option<String>, id: u64, prompt: String, tx: Sender<ReplyMsg>) {
    let Some(cmdline) = cmdline else {
        let _ = tx.send(ReplyMsg {
            id,
            outcome: Ok(canned_reply(&prompt)),
        });
        return;
    };
    thread::spawn(move || {
        debug!(id, cmd = %cmdline, "running responder");
        let outcome = run_responder(&cmdline, &prompt).map_err(|e| {
            warn!(id, error = %format!("{e:#}"), "responder failed");
            format!("{e:#}")
        });
        let _ = tx.send(ReplyMsg { id, outcome });
    });
}

const CANNED: &[(&[&str], &str)] = &[
    (
        &["expense", "spend", "spent", "add"],
        "Open Expenses and use \"Add Expense\" to record an amount, category, date and payment method. Recent entries appear in the list below the charts.",
    ),
    (
        &["budget", "limit", "category"],
        "Use \"Manage Budget\" on the Expenses page to set a total budget and per-category limits. Categories over their limit are highlighted.",
    ),
    (
        &["saving", "save", "goal"],
        "Your savings goal lives in the budget settings. The savings chart compares what is left of the budget against that goal.",
    ),
    (
        &["shortcut", "key", "ctrl"],
        "Press Ctrl+K (Cmd+K on macOS) anywhere to open or close this panel, and Esc to close it.",
    ),
];

/// Local help used when no responder is configured or the responder fails.
pub fn canned_reply(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    CANNED
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, reply)| reply.to_string())
        .unwrap_or_else(|| {
            "I can help with expenses, budgets, savings goals and shortcuts. Try asking \"how do I add an expense?\"".to_string()
        })
}
