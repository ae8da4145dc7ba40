//! Typed access to the store's key/value configuration map (§6), layered
//! over `Store::config_get`/`config_set`. Reserved keys: `version` (set by
//! the store itself) and `defaults`, consulted when a field is omitted at
//! task creation.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use taskcurve_core::Result;

use crate::store::Store;

pub const DEFAULTS_KEY: &str = "defaults";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub curve_type: String,
    pub work_hours_start: NaiveTime,
    pub work_hours_end: NaiveTime,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            curve_type: "linear".to_string(),
            work_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_hours_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }
}

pub fn load_defaults(store: &Store) -> Result<Defaults> {
    match store.config_get(DEFAULTS_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Defaults::default()),
    }
}

pub fn save_defaults(store: &Store, defaults: &Defaults) -> Result<()> {
    let raw = serde_json::to_string(defaults)?;
    store.config_set(DEFAULTS_KEY, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_defaults_key_falls_back_to_builtin_defaults() {
        let store = Store::new();
        let defaults = load_defaults(&store).unwrap();
        assert_eq!(defaults.curve_type, "linear");
    }

    #[test]
    fn saved_defaults_round_trip() {
        let store = Store::new();
        let mut defaults = Defaults::default();
        defaults.curve_type = "exponential".to_string();
        save_defaults(&store, &defaults).unwrap();
        let reloaded = load_defaults(&store).unwrap();
        assert_eq!(reloaded.curve_type, "exponential");
    }
}
