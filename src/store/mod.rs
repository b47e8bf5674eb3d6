//! お気に入り・最近の検索の永続化と変更通知
//!
//! localStorage を唯一の正とし、各画面は読み込んだ写しを表示するだけ。
//! 書き込みのたびに `broadcast` で通知し、他の画面・他のタブが読み直す。

pub mod broadcast;
pub mod favorites;
pub mod observer;
pub mod recent;
pub mod storage;

pub use broadcast::{ChangeBroadcast, ChangeTransport};
pub use favorites::FavoritesStore;
pub use observer::{use_favorites, FavoritesHandle};
pub use recent::RecentSearches;
pub use storage::KeyValueStorage;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("browser storage is unavailable")]
    Unavailable,
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("failed to encode stored value: {0}")]
    Encode(String),
    #[error("stored list changed concurrently (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },
}
