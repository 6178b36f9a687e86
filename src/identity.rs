//! Per-device display name.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::Result;

/// Key under which the display name is persisted.
pub const DISPLAY_NAME_KEY: &str = "chatUsername";

const ADJECTIVES: [&str; 8] = [
    "Happy",
    "Clever",
    "Brave",
    "Friendly",
    "Witty",
    "Curious",
    "Energetic",
    "Gentle",
];
const NOUNS: [&str; 8] = [
    "Penguin", "Tiger", "Eagle", "Dolphin", "Panda", "Fox", "Koala", "Wolf",
];

/// Device-local key-value storage.
pub trait LocalStorage {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn store(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        (**self).store(key, value)
    }
}

/// Process-lifetime storage, used when nothing should touch the disk.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl LocalStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `<Adjective><Noun><0..1000>`, e.g. `HappyPenguin42`.
pub fn generate_display_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or(ADJECTIVES[0]);
    let noun = NOUNS.choose(rng).copied().unwrap_or(NOUNS[0]);
    let number = rng.gen_range(0..1000);
    format!("{adjective}{noun}{number}")
}

pub struct IdentityProvider<S> {
    storage: S,
}

impl<S: LocalStorage> IdentityProvider<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn get_or_create_display_name(&self) -> String {
        self.get_or_create_with(&mut rand::thread_rng())
    }

    /// Returns the stored name, generating and persisting one on first use.
    /// Storage failures are logged; the caller always gets a name.
    pub fn get_or_create_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self.storage.load(DISPLAY_NAME_KEY) {
            Ok(Some(name)) => return name,
            Ok(None) => {}
            Err(err) => log::warn!("Failed to read stored display name: {err}"),
        }

        let name = generate_display_name(rng);
        match self.storage.store(DISPLAY_NAME_KEY, &name) {
            Ok(()) => log::info!("Generated display name {name}"),
            Err(err) => log::warn!("Display name {name} will not survive a restart: {err}"),
        }
        name
    }
}
