//! `localStorage`-backed statistics store.
use geoquiz_game::StatsStore;

use crate::dom;

/// Keeps the statistics blob in the browser's `localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

#[derive(Debug, thiserror::Error)]
pub enum WebStorageError {
    #[error("localStorage unavailable: {0}")]
    Unavailable(String),
    #[error("localStorage read failed: {0}")]
    Read(String),
    #[error("localStorage write failed: {0}")]
    Write(String),
}

impl StatsStore for LocalStorageStore {
    type Error = WebStorageError;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let storage = dom::local_storage()
            .map_err(|e| WebStorageError::Unavailable(dom::js_error_message(&e)))?;
        storage
            .get_item(key)
            .map_err(|e| WebStorageError::Read(dom::js_error_message(&e)))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), Self::Error> {
        let storage = dom::local_storage()
            .map_err(|e| WebStorageError::Unavailable(dom::js_error_message(&e)))?;
        storage
            .set_item(key, blob)
            .map_err(|e| WebStorageError::Write(dom::js_error_message(&e)))
    }
}
