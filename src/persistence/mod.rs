//! Wallet persistence
//!
//! The wallet (currency plus consumable counts) is one flat JSON record saved
//! through a [`Store`] at session boundaries. Unreadable records load as an
//! empty wallet; save failures are logged and never end a session.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::Rejection;
use crate::tuning::StoreConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("wallet record could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Flat string key-value storage
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| StoreError::Unavailable("no LocalStorage".into()))
    }
}

#[cfg(target_arch = "wasm32")]
impl Store for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }
}

/// Items sold for currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreItem {
    CrushBooster,
    TimeBooster,
    Purge,
}

impl StoreItem {
    pub fn cost(&self, prices: &StoreConfig) -> u64 {
        match self {
            StoreItem::CrushBooster => prices.crush_booster_cost,
            StoreItem::TimeBooster => prices.time_booster_cost,
            StoreItem::Purge => prices.purge_cost,
        }
    }

    pub fn booster(&self) -> Booster {
        match self {
            StoreItem::CrushBooster => Booster::Crush,
            StoreItem::TimeBooster => Booster::Time,
            StoreItem::Purge => Booster::Purge,
        }
    }
}

impl fmt::Display for StoreItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreItem::CrushBooster => "Crush Booster",
            StoreItem::TimeBooster => "Time Booster",
            StoreItem::Purge => "Purge",
        })
    }
}

/// Owned consumables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Booster {
    Crush,
    Time,
    Purge,
}

impl fmt::Display for Booster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Booster::Crush => "Crush Booster",
            Booster::Time => "Time Booster",
            Booster::Purge => "Purge",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wallet {
    /// Crush keys, earned 1:1 from session score
    pub currency: u64,
    pub crush_boosters: u32,
    pub time_boosters: u32,
    pub purges: u32,
}

impl Wallet {
    pub const STORAGE_KEY: &'static str = "cosmic_crush_wallet";

    /// Load from `store`; missing or malformed records give an empty wallet
    pub fn load(store: &dyn Store) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(wallet) => {
                    log::info!("Loaded wallet");
                    wallet
                }
                Err(e) => {
                    log::warn!("Discarding malformed wallet record: {}", e);
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("No wallet found, starting fresh");
                Self::default()
            }
            Err(e) => {
                log::warn!("Wallet load failed: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn Store) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Wallet saved ({} crush keys)", self.currency);
        Ok(())
    }

    pub fn count(&self, booster: Booster) -> u32 {
        match booster {
            Booster::Crush => self.crush_boosters,
            Booster::Time => self.time_boosters,
            Booster::Purge => self.purges,
        }
    }

    fn count_mut(&mut self, booster: Booster) -> &mut u32 {
        match booster {
            Booster::Crush => &mut self.crush_boosters,
            Booster::Time => &mut self.time_boosters,
            Booster::Purge => &mut self.purges,
        }
    }

    pub fn credit(&mut self, amount: u64) {
        self.currency = self.currency.saturating_add(amount);
    }

    /// Spend currency on one `item`
    pub fn purchase(&mut self, item: StoreItem, prices: &StoreConfig) -> Result<(), Rejection> {
        let cost = item.cost(prices);
        if self.currency < cost {
            return Err(Rejection::InsufficientCurrency {
                item,
                cost,
                balance: self.currency,
            });
        }
        self.currency -= cost;
        *self.count_mut(item.booster()) += 1;
        Ok(())
    }

    /// Use up one owned `booster`
    pub fn consume(&mut self, booster: Booster) -> Result<(), Rejection> {
        let count = self.count_mut(booster);
        if *count == 0 {
            return Err(Rejection::NotOwned { booster });
        }
        *count -= 1;
        Ok(())
    }
}
