#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use geocache_sim::{
    GameConfig, GameSession, KeyValueStore, LatLng, MemoryStore, PersistenceError,
};

static INIT: Once = Once::new();

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_game_config.json")
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path();

        debug_assert!(
            config_path.exists(),
            "missing test game config at {}",
            config_path.display()
        );

        std::env::set_var("GEOCACHE_CONFIG_PATH", &config_path);
    });
}

/// Lattice anchored at (0, 0) with a small neighbourhood.
pub fn test_config() -> Arc<GameConfig> {
    Arc::new(GameConfig {
        origin: LatLng::new(0.0, 0.0),
        neighborhood_size: 4,
        ..GameConfig::default()
    })
}

pub fn test_session() -> GameSession {
    GameSession::new(test_config(), Box::new(MemoryStore::new()))
}

/// Memory store that counts writes.
pub struct CountingStore {
    inner: MemoryStore,
    writes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> (Self, Arc<AtomicUsize>) {
        let writes = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                writes: Arc::clone(&writes),
            },
            writes,
        )
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}
