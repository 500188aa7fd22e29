use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Keys consulted by the crane's update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKey {
    /// `q`: raise the boom.
    BoomUp,
    /// `e`: lower the boom.
    BoomDown,
    /// `w`: reel the cable in.
    CableIn,
    /// `s`: pay the cable out.
    CableOut,
    /// `a`: slew the platform counter-clockwise.
    SlewLeft,
    /// `d`: slew the platform clockwise.
    SlewRight,
    /// `arrowleft`: move the trolley towards the tower.
    TrolleyIn,
    /// `arrowright`: move the trolley towards the boom tip.
    TrolleyOut,
}

impl ControlKey {
    pub const ALL: [ControlKey; 8] = [
        ControlKey::BoomUp,
        ControlKey::BoomDown,
        ControlKey::CableIn,
        ControlKey::CableOut,
        ControlKey::SlewLeft,
        ControlKey::SlewRight,
        ControlKey::TrolleyIn,
        ControlKey::TrolleyOut,
    ];

    /// Lowercase key name as delivered by the keyboard source.
    pub const fn key_name(self) -> &'static str {
        match self {
            ControlKey::BoomUp => "q",
            ControlKey::BoomDown => "e",
            ControlKey::CableIn => "w",
            ControlKey::CableOut => "s",
            ControlKey::SlewLeft => "a",
            ControlKey::SlewRight => "d",
            ControlKey::TrolleyIn => "arrowleft",
            ControlKey::TrolleyOut => "arrowright",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = normalize_key(name);
        Self::ALL.into_iter().find(|key| key.key_name() == name)
    }

    pub const fn description(self) -> &'static str {
        match self {
            ControlKey::BoomUp => "raise boom",
            ControlKey::BoomDown => "lower boom",
            ControlKey::CableIn => "shorten cable",
            ControlKey::CableOut => "lengthen cable",
            ControlKey::SlewLeft => "rotate left",
            ControlKey::SlewRight => "rotate right",
            ControlKey::TrolleyIn => "trolley in",
            ControlKey::TrolleyOut => "trolley out",
        }
    }
}

/// Key names are case-insensitive; `Q` and `q` are the same key.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Thread-safe record of which keys are currently held.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashMap<String, bool>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&self, key: &str, held: bool) {
        self.keys.write().insert(normalize_key(key), held);
    }

    pub fn set_key_down(&self, key: &str) {
        self.set_key(key, true);
    }

    pub fn set_key_up(&self, key: &str) {
        self.set_key(key, false);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.keys
            .read()
            .get(&normalize_key(key))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_control_held(&self, key: ControlKey) -> bool {
        self.is_held(key.key_name())
    }

    /// Releases every key.
    pub fn clear(&self) {
        self.keys.write().clear();
    }

    /// Copies the held keys under a single read lock.
    pub fn snapshot(&self) -> InputSnapshot {
        let keys = self.keys.read();
        InputSnapshot {
            keys: keys.clone(),
        }
    }
}

/// Immutable view of [`InputState`] taken at the start of a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    keys: HashMap<String, bool>,
}

impl InputSnapshot {
    /// Snapshot with exactly the given keys held.
    pub fn held<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|key| (normalize_key(key.as_ref()), true))
                .collect(),
        }
    }

    pub fn with_controls(keys: &[ControlKey]) -> Self {
        Self::held(keys.iter().map(|key| key.key_name()))
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.keys.get(&normalize_key(key)).copied().unwrap_or(false)
    }

    pub fn is_down(&self, key: ControlKey) -> bool {
        self.keys.get(key.key_name()).copied().unwrap_or(false)
    }

    pub fn any_held(&self) -> bool {
        self.keys.values().any(|held| *held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_key_names() {
        assert_eq!(ControlKey::from_name("q"), Some(ControlKey::BoomUp));
        assert_eq!(ControlKey::from_name("Q"), Some(ControlKey::BoomUp));
        assert_eq!(
            ControlKey::from_name("ArrowLeft"),
            Some(ControlKey::TrolleyIn)
        );
        assert_eq!(ControlKey::from_name("x"), None);
    }

    #[test]
    fn input_state_tracks_keys() {
        let state = InputState::new();
        assert!(!state.is_held("a"));
        state.set_key_down("A");
        assert!(state.is_held("a"));
        assert!(state.is_control_held(ControlKey::SlewLeft));
        state.set_key_up("a");
        assert!(!state.is_held("a"));
    }

    #[test]
    fn unknown_keys_are_stored_harmlessly() {
        let state = InputState::new();
        state.set_key("F13", true);
        assert!(state.is_held("f13"));
        let snapshot = state.snapshot();
        assert!(ControlKey::ALL.iter().all(|key| !snapshot.is_down(*key)));
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let state = InputState::new();
        state.set_key_down("w");
        let snapshot = state.snapshot();
        state.set_key_up("w");
        state.set_key_down("s");
        assert!(snapshot.is_down(ControlKey::CableIn));
        assert!(!snapshot.is_down(ControlKey::CableOut));
    }

    #[test]
    fn clear_releases_everything() {
        let state = InputState::new();
        state.set_key_down("q");
        state.set_key_down("arrowright");
        state.clear();
        assert!(!state.snapshot().any_held());
    }
}
