#![forbid(unsafe_code)]
//! Browser bindings for GeoQuiz.
//!
//! The presentation layer (map rendering, dialogs, timers) lives in
//! JavaScript; this crate exposes the engine to it through [`QuizHandle`] and
//! persists statistics in `localStorage`.
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod bindings;
pub mod dom;
pub mod storage;

pub use bindings::QuizHandle;
pub use storage::{LocalStorageStore, WebStorageError};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
