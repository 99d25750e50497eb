use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes / patterns. If any leaf string value in the
/// effective config starts with one of these, we abort with
/// CONFIG_SECRET_DETECTED. API keys are referenced by env-var name in the
/// config and read from the environment at use time, never inline.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "gsk_",       // Groq
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

/// Menu-planner / bill-scanner endpoint settings. The actual key is read
/// from the env var named by `api_key_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_planner_base_url")]
    pub base_url: String,
    #[serde(default = "default_planner_model")]
    pub model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_planner_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_planner_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_vision_model() -> String {
    "llama-3.2-11b-vision-preview".to_string()
}

fn default_api_key_env() -> String {
    "SKO_PLANNER_API_KEY".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: default_planner_base_url(),
            model: default_planner_model(),
            vision_model: default_vision_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Footfall forecasting fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Prediction used when the sales log holds too few samples to model.
    #[serde(default = "default_footfall")]
    pub default_footfall: i64,
}

fn default_footfall() -> i64 {
    15
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_footfall: default_footfall(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Override for the HTTP bind address (default 127.0.0.1:8790).
    #[serde(default)]
    pub bind_addr: Option<String>,
}

/// Effective application config after layering and validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the append-only kitchen journal; journaling is disabled
    /// when unset.
    #[serde(default)]
    pub journal_path: Option<String>,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

// ---------------------------------------------------------------------------
// Layered loading + hashing
// ---------------------------------------------------------------------------

/// A loaded config with its canonical form and hash, for log attribution.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Load YAML layers in merge order (base first, overrides later) from
/// file paths.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML docs in order: earlier docs are base, later docs override.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    // Enforce "no secrets as literal values" policy.
    enforce_no_secret_literals(&merged)?;

    let config: AppConfig =
        serde_json::from_value(merged.clone()).context("config shape invalid")?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config,
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Canonical form: compact JSON with recursively sorted object keys, so
/// the hash is independent of YAML key order across layers.
fn canonicalize_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_layers_yield_defaults() {
        let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
        assert_eq!(loaded.config.forecast.default_footfall, 15);
        assert_eq!(loaded.config.planner.api_key_env, "SKO_PLANNER_API_KEY");
        assert!(loaded.config.journal_path.is_none());
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let base = r#"
forecast:
  default_footfall: 20
journal_path: /var/lib/sko/journal.jsonl
"#;
        let local = r#"
forecast:
  default_footfall: 40
"#;
        let loaded = load_layered_yaml_from_strings(&[base, local]).unwrap();
        assert_eq!(loaded.config.forecast.default_footfall, 40);
        // Untouched keys from the base layer survive the merge.
        assert_eq!(
            loaded.config.journal_path.as_deref(),
            Some("/var/lib/sko/journal.jsonl")
        );
    }

    #[test]
    fn config_hash_ignores_key_order() {
        let a = load_layered_yaml_from_strings(&["planner:\n  model: m\n  base_url: b\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["planner:\n  base_url: b\n  model: m\n"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn config_hash_changes_with_content() {
        let a = load_layered_yaml_from_strings(&["forecast:\n  default_footfall: 15\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["forecast:\n  default_footfall: 16\n"]).unwrap();
        assert_ne!(a.config_hash, b.config_hash);
    }

    #[test]
    fn inline_secret_aborts_load() {
        let doc = r#"
planner:
  api_key_env: "gsk_abcdef0123456789"
"#;
        let err = load_layered_yaml_from_strings(&[doc]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
        // The secret value itself must not appear in the error.
        assert!(!err.to_string().contains("gsk_abcdef0123456789"));
    }

    #[test]
    fn short_strings_are_not_flagged_as_secrets() {
        // "sk-" alone is under the 8-char floor.
        let loaded = load_layered_yaml_from_strings(&["journal_path: sk-\n"]).unwrap();
        assert_eq!(loaded.config.journal_path.as_deref(), Some("sk-"));
    }
}
