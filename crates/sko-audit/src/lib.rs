use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Append-only kitchen journal. Writes JSON Lines (one event per line).
/// Optional hash chain: each event can include hash_prev + hash_self.
///
/// The journal mirrors the DB movement log at batch granularity: one
/// `reconcile_batch` event per reconciliation, one `manual_adjust` event
/// per operator adjustment, so an operator can audit what happened and
/// who triggered it without querying the store.
pub struct JournalWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Monotonically increasing sequence counter for `event_id` derivation.
    /// Starts at 0 and increments on every `append` call.
    /// When resuming an existing journal (e.g. after restart), restore with
    /// `set_seq(events_already_written)` alongside `set_last_hash`.
    seq: u64,
}

impl JournalWriter {
    /// Creates the journal writer and ensures parent dirs exist.
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Open a journal and restore chain state from its existing content:
    /// seq becomes the number of events already written and last_hash the
    /// final event's hash_self, so the chain continues unbroken. A
    /// missing file behaves like [`JournalWriter::new`].
    pub fn resume(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let mut writer = Self::new(path.as_ref(), hash_chain)?;

        if path.as_ref().exists() {
            let content = fs::read_to_string(path.as_ref())
                .with_context(|| format!("read journal {:?}", path.as_ref()))?;
            let mut count = 0u64;
            let mut last_hash: Option<String> = None;
            for (i, line) in content.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let ev: JournalEvent = serde_json::from_str(trimmed)
                    .with_context(|| format!("parse journal event at line {}", i + 1))?;
                count += 1;
                last_hash = ev.hash_self;
            }
            writer.seq = count;
            writer.last_hash = last_hash;
        }

        Ok(writer)
    }

    /// Set last hash explicitly (e.g., after reading last line on restart).
    pub fn set_last_hash(&mut self, last_hash: Option<String>) {
        self.last_hash = last_hash;
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// Set the sequence counter when resuming an existing journal.
    /// Pass the number of events already written (the next event's seq =
    /// this value). Must be called together with `set_last_hash`.
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Current sequence counter (equals the number of events appended so far).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one event. `actor` is the session username or the fixed
    /// planner attribution tag.
    pub fn append(
        &mut self,
        actor: &str,
        topic: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<JournalEvent> {
        let ts_utc = Utc::now();
        // event_id derived deterministically from chain state + payload + seq.
        // No RNG, so replaying the same journal yields the same ids.
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?;
        self.seq += 1;

        let mut ev = JournalEvent {
            event_id,
            actor: actor.to_string(),
            ts_utc,
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            let prev = self.last_hash.clone();
            ev.hash_prev = prev;

            let self_hash = compute_event_hash(&ev)?;
            ev.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        Ok(ev)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEvent {
    pub event_id: Uuid,
    pub actor: String,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Namespace for UUIDv5 event-id derivation (fixed, arbitrary).
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x7b0c_2a1e_9d34_4f68_8c55_1a2b3c4d5e6f);

/// Deterministic event id: UUIDv5 over `prev_hash ‖ seq ‖ canonical payload`.
fn derive_event_id(prev_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical_payload =
        serde_json::to_string(&sort_keys(payload)).context("serialize payload for event id")?;
    let material = format!("{}|{}|{}", prev_hash.unwrap_or(""), seq, canonical_payload);
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, material.as_bytes()))
}

/// Write a single line to file (with trailing newline).
fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write journal line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One event == one JSON line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal event failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
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

/// Hash chain is computed from canonical JSON of the event WITHOUT
/// hash_self (to avoid self-reference).
pub fn compute_event_hash(ev: &JournalEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the hash chain integrity of a journal file.
///
/// Returns Ok(VerifyResult) describing whether the chain is intact or
/// where it breaks.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Verify the hash chain integrity of a journal string (JSONL content).
///
/// Same logic as [`verify_hash_chain`] but operates on an in-memory
/// `&str`. Useful for testing and for callers that hold the journal
/// content without a file path.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: JournalEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse journal event at line {}", i + 1))?;

        line_count += 1;

        // 1. Verify hash_prev matches the previous event's hash_self
        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        // 2. Verify hash_self is correct for this event's content
        if let Some(ref claimed_hash) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed_hash != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed_hash, recomputed
                    ),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The entire chain is valid.
    Valid { lines: usize },
    /// The chain is broken at the given line.
    Broken { line: usize, reason: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_ids_are_deterministic() {
        let payload = json!({"item": "Rice", "qty_milli": 3_500});
        let a = derive_event_id(None, &payload, 0).unwrap();
        let b = derive_event_id(None, &payload, 0).unwrap();
        assert_eq!(a, b);

        // Different seq or chain state must change the id.
        let c = derive_event_id(None, &payload, 1).unwrap();
        assert_ne!(a, c);
        let d = derive_event_id(Some("abc"), &payload, 0).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn event_id_ignores_payload_key_order() {
        let a = derive_event_id(None, &json!({"a": 1, "b": 2}), 0).unwrap();
        let b = derive_event_id(None, &json!({"b": 2, "a": 1}), 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sort_keys_is_recursive() {
        let v = json!({"z": {"b": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        let sorted = sort_keys(&v);
        let s = serde_json::to_string(&sorted).unwrap();
        assert_eq!(s, r#"{"a":[{"x":2,"y":1}],"z":{"a":2,"b":1}}"#);
    }
}
