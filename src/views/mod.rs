//! ビューモジュール
//!
//! ルートごとの画面。API の結果は `LoadState` として保持する。

pub mod favorites;
pub mod home;
pub mod product_detail;
pub mod profile;
pub mod search;
pub mod start;

pub use favorites::FavoritesView;
pub use home::HomeView;
pub use product_detail::ProductDetailView;
pub use profile::ProfileView;
pub use search::SearchView;
pub use start::StartView;

use crate::utils::api::FetchError;

/// 非同期取得の状態
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => LoadState::Loaded(value),
            Err(e) => LoadState::Failed(e.user_message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_state_from_result() {
        assert_eq!(LoadState::from_result(Ok(3)), LoadState::Loaded(3));
        assert_eq!(
            LoadState::<u8>::from_result(Err(FetchError::NotFound)),
            LoadState::Failed("Product not found.".to_string())
        );
    }
}
