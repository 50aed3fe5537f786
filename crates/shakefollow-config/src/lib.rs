//! Layered YAML configuration with canonical-JSON hashing, plus a typed
//! application settings view and a secrets loader.

pub mod secrets;
pub mod settings;

pub use secrets::SmtpCredentials;
pub use settings::{EmitterSettings, EngineSettings, ProvidersSettings, SchedulerSettings, Settings};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn later_file_overrides_earlier_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let env = dir.path().join("env.yaml");
        write!(fs::File::create(&base).unwrap(), "scheduler:\n  poll_interval_secs: 10\n").unwrap();
        write!(fs::File::create(&env).unwrap(), "scheduler:\n  poll_interval_secs: 5\n").unwrap();

        let loaded = load_layered_yaml(&[base.to_str().unwrap(), env.to_str().unwrap()]).unwrap();
        assert_eq!(
            loaded.config_json["scheduler"]["poll_interval_secs"],
            serde_json::json!(5)
        );
    }

    #[test]
    fn hash_is_stable_across_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        write!(fs::File::create(&a).unwrap(), "b: 2\na: 1\n").unwrap();
        write!(fs::File::create(&b).unwrap(), "a: 1\nb: 2\n").unwrap();

        let loaded_a = load_layered_yaml(&[a.to_str().unwrap()]).unwrap();
        let loaded_b = load_layered_yaml(&[b.to_str().unwrap()]).unwrap();
        assert_eq!(loaded_a.config_hash, loaded_b.config_hash);
    }
}
