//! アプリ設定
//!
//! 既定値はコンパイル時に決まり、localStorage の `cafe_menu_config_v1` に
//! JSON があれば部分的に上書きする。

use serde::{Deserialize, Serialize};

use crate::models::{Category, ProductKind};
use crate::store::KeyValueStorage;

pub const CONFIG_KEY: &str = "cafe_menu_config_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cocktail_api: String,
    pub meal_api: String,
    /// 入力が止まってから検索するまでの待ち時間
    pub debounce_ms: u32,
    pub recent_limit: usize,
    pub suggestion_limit: usize,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u32,
    pub log_level: String,
    pub prices: PriceBook,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cocktail_api: "https://www.thecocktaildb.com/api/json/v1/1".to_string(),
            meal_api: "https://www.themealdb.com/api/json/v1/1".to_string(),
            debounce_ms: 220,
            recent_limit: 8,
            suggestion_limit: 6,
            retry_attempts: 3,
            retry_base_delay_ms: 300,
            log_level: "info".to_string(),
            prices: PriceBook::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// ストレージの上書き設定を読む。壊れていれば既定値
    pub fn load(storage: &dyn KeyValueStorage) -> Self {
        match storage.get(CONFIG_KEY) {
            None => Self::default(),
            Some(raw) => match Self::from_json(&raw) {
                Ok(config) => {
                    log::info!(target: "config", "loaded config override from {}", CONFIG_KEY);
                    config
                }
                Err(e) => {
                    log::warn!(target: "config", "ignoring invalid {}: {}", CONFIG_KEY, e);
                    Self::default()
                }
            },
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn api_base(&self, kind: ProductKind) -> &str {
        let base = match kind {
            ProductKind::Drink => &self.cocktail_api,
            ProductKind::Meal => &self.meal_api,
        };
        base.trim_end_matches('/')
    }
}

/// お気に入り登録時に固定する価格表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceBook {
    pub coffee: String,
    pub drink: String,
    pub beef: String,
    pub chicken: String,
    pub dessert: String,
    /// カテゴリが分からない時（検索・詳細）の価格
    pub any_drink: String,
    pub any_meal: String,
}

impl Default for PriceBook {
    fn default() -> Self {
        Self {
            coffee: "4.50".to_string(),
            drink: "14.99".to_string(),
            beef: "12.99".to_string(),
            chicken: "12.99".to_string(),
            dessert: "8.99".to_string(),
            any_drink: "14.99".to_string(),
            any_meal: "24.99".to_string(),
        }
    }
}

impl PriceBook {
    pub fn for_category(&self, category: Category) -> &str {
        match category {
            Category::Coffee => &self.coffee,
            Category::Drink => &self.drink,
            Category::Beef => &self.beef,
            Category::Chicken => &self.chicken,
            Category::Dessert => &self.dessert,
        }
    }

    pub fn for_kind(&self, kind: ProductKind) -> &str {
        match kind {
            ProductKind::Drink => &self.any_drink,
            ProductKind::Meal => &self.any_meal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::storage::MemoryStorage;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"debounce_ms": 300, "prices": {"coffee": "5.00"}}"#).unwrap();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.recent_limit, 8);
        assert_eq!(config.prices.coffee, "5.00");
        assert_eq!(config.prices.beef, "12.99");
    }

    #[test]
    fn test_invalid_override_falls_back() {
        let storage = MemoryStorage::new();
        storage.set(CONFIG_KEY, "{oops").unwrap();
        assert_eq!(AppConfig::load(&storage), AppConfig::default());
    }

    #[test]
    fn test_api_base_trims_slash() {
        let config = AppConfig {
            meal_api: "http://localhost:9000/api/".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.api_base(ProductKind::Meal), "http://localhost:9000/api");
    }

    #[test]
    fn test_log_level_parse() {
        let mut config = AppConfig::default();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
        config.log_level = "debug".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
        config.log_level = "chatty".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_prices() {
        let prices = PriceBook::default();
        assert_eq!(prices.for_category(Category::Drink), "14.99");
        assert_eq!(prices.for_kind(ProductKind::Meal), "24.99");
    }
}
