use std::collections::{HashMap, HashSet};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Cooldown between posting/creating/reporting actions.
pub const ACTION_COOLDOWN_MS: i64 = 10_000;
/// Per-survey window during which repeat views are not counted.
pub const VIEW_DEBOUNCE_MS: i64 = 5 * 60 * 1000;

/// Cached device entries above this are dropped wholesale; the JSON
/// files are the source of truth, so eviction only costs a re-read.
const CACHE_CAP: usize = 1024;

/// One device's one-time-action markers. Cooperative bookkeeping, not
/// an auth boundary: wiping the store forfeits edit/delete rights and
/// re-enables voting, exactly like clearing browser storage did.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(default)]
    votes: HashMap<Uuid, String>,
    #[serde(default)]
    likes: HashSet<Uuid>,
    #[serde(default)]
    watched: HashSet<Uuid>,
    #[serde(default)]
    comment_keys: HashMap<Uuid, String>,
    #[serde(default)]
    reactions: HashSet<String>,
    #[serde(default)]
    last_action_ms: Option<i64>,
    #[serde(default)]
    last_viewed_ms: HashMap<Uuid, i64>,
}

/// File-per-device JSON persistence with an in-memory cache. All
/// operations are synchronous; each handler touches one device entry
/// under the lock and writes it back before returning.
pub struct DeviceStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, DeviceState>>,
}

impl DeviceStore {
    pub fn new(path: &str) -> Result<Self, Error> {
        create_dir_all(path)?;
        Ok(Self {
            path: PathBuf::from(path),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn file_path(&self, device_id: &str) -> PathBuf {
        self.path.join(format!("{}.json", device_id))
    }

    fn load(&self, device_id: &str) -> DeviceState {
        let file_path = self.file_path(device_id);
        if !Path::new(&file_path).exists() {
            return DeviceState::default();
        }
        let read = || -> Result<DeviceState, Error> {
            let mut content = String::new();
            File::open(&file_path)?.read_to_string(&mut content)?;
            Ok(serde_json::from_str(&content)?)
        };
        match read() {
            Ok(state) => state,
            Err(e) => {
                log::warn!("discarding unreadable device state {}: {}", device_id, e);
                DeviceState::default()
            }
        }
    }

    fn persist(&self, device_id: &str, state: &DeviceState) -> Result<(), Error> {
        let mut file = File::create(self.file_path(device_id))?;
        file.write_all(serde_json::to_string(state)?.as_bytes())?;
        Ok(())
    }

    fn with_state<R>(&self, device_id: &str, f: impl FnOnce(&mut DeviceState) -> R) -> Result<R, Error> {
        let mut cache = self.cache.lock().map_err(|_| Error::ServerError("device store lock poisoned".into()))?;
        if !cache.contains_key(device_id) {
            if cache.len() >= CACHE_CAP {
                cache.clear();
            }
            let loaded = self.load(device_id);
            cache.insert(device_id.to_owned(), loaded);
        }
        let state = cache
            .get_mut(device_id)
            .ok_or_else(|| Error::ServerError("device state vanished".into()))?;
        let result = f(state);
        self.persist(device_id, state)?;
        Ok(result)
    }

    pub fn has_voted(&self, device_id: &str, survey_id: Uuid) -> Result<Option<String>, Error> {
        self.with_state(device_id, |s| s.votes.get(&survey_id).cloned())
    }

    /// At most one recorded vote per survey per device; a second call
    /// keeps the first choice.
    pub fn record_vote(&self, device_id: &str, survey_id: Uuid, option_name: &str) -> Result<(), Error> {
        self.with_state(device_id, |s| {
            s.votes.entry(survey_id).or_insert_with(|| option_name.to_owned());
        })
    }

    pub fn is_liked(&self, device_id: &str, survey_id: Uuid) -> Result<bool, Error> {
        self.with_state(device_id, |s| s.likes.contains(&survey_id))
    }

    /// Flips membership and reports the new state; the caller issues
    /// the matching counter adjustment against the store.
    pub fn toggle_like(&self, device_id: &str, survey_id: Uuid) -> Result<bool, Error> {
        self.with_state(device_id, |s| {
            if s.likes.remove(&survey_id) {
                false
            } else {
                s.likes.insert(survey_id);
                true
            }
        })
    }

    pub fn is_watched(&self, device_id: &str, survey_id: Uuid) -> Result<bool, Error> {
        self.with_state(device_id, |s| s.watched.contains(&survey_id))
    }

    pub fn toggle_watch(&self, device_id: &str, survey_id: Uuid) -> Result<bool, Error> {
        self.with_state(device_id, |s| {
            if s.watched.remove(&survey_id) {
                false
            } else {
                s.watched.insert(survey_id);
                true
            }
        })
    }

    pub fn watched_set(&self, device_id: &str) -> Result<HashSet<Uuid>, Error> {
        self.with_state(device_id, |s| s.watched.clone())
    }

    pub fn owns_comment(&self, device_id: &str, comment_id: Uuid) -> Result<Option<String>, Error> {
        self.with_state(device_id, |s| s.comment_keys.get(&comment_id).cloned())
    }

    pub fn record_comment_ownership(&self, device_id: &str, comment_id: Uuid, key: &str) -> Result<(), Error> {
        self.with_state(device_id, |s| {
            s.comment_keys.insert(comment_id, key.to_owned());
        })
    }

    pub fn has_reacted(&self, device_id: &str, comment_id: Uuid, kind: &str) -> Result<bool, Error> {
        self.with_state(device_id, |s| s.reactions.contains(&reaction_key(comment_id, kind)))
    }

    pub fn toggle_reaction(&self, device_id: &str, comment_id: Uuid, kind: &str) -> Result<bool, Error> {
        self.with_state(device_id, |s| {
            let key = reaction_key(comment_id, kind);
            if s.reactions.remove(&key) {
                false
            } else {
                s.reactions.insert(key);
                true
            }
        })
    }

    /// True when enough time passed since the last recorded action.
    /// `bypass` is the administrator override.
    pub fn check_rate_limit(&self, device_id: &str, now_ms: i64, cooldown_ms: i64, bypass: bool) -> Result<bool, Error> {
        if bypass {
            return Ok(true);
        }
        self.with_state(device_id, |s| match s.last_action_ms {
            None => true,
            Some(last) => now_ms - last >= cooldown_ms,
        })
    }

    pub fn record_action(&self, device_id: &str, now_ms: i64) -> Result<(), Error> {
        self.with_state(device_id, |s| {
            s.last_action_ms = Some(now_ms);
        })
    }

    pub fn rate_limit_wait_ms(&self, device_id: &str, now_ms: i64, cooldown_ms: i64) -> Result<i64, Error> {
        self.with_state(device_id, |s| match s.last_action_ms {
            None => 0,
            Some(last) => (last + cooldown_ms - now_ms).max(0),
        })
    }

    /// Debounced view counting: records and reports true at most once
    /// per survey per window.
    pub fn should_count_view(&self, device_id: &str, survey_id: Uuid, now_ms: i64) -> Result<bool, Error> {
        self.with_state(device_id, |s| {
            let last = s.last_viewed_ms.get(&survey_id).copied().unwrap_or(0);
            if last != 0 && now_ms - last < VIEW_DEBOUNCE_MS {
                return false;
            }
            s.last_viewed_ms.insert(survey_id, now_ms);
            true
        })
    }

    /// Drops the view marker so a view whose remote increment failed
    /// can be retried before the window elapses.
    pub fn forget_view(&self, device_id: &str, survey_id: Uuid) -> Result<(), Error> {
        self.with_state(device_id, |s| {
            s.last_viewed_ms.remove(&survey_id);
        })
    }
}

fn reaction_key(comment_id: Uuid, kind: &str) -> String {
    format!("{}:{}", comment_id, kind)
}
