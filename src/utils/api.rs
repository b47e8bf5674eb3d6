//! メニューAPI（TheCocktailDB / TheMealDB）連携

use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::config::AppConfig;
use crate::models::{Category, Ingredient, Product, ProductKind};

/// 材料欄（strIngredientN / strMeasureN）の最大番号
const MAX_INGREDIENTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("window is not available")]
    NoWindow,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("product not found")]
    NotFound,
}

impl FetchError {
    /// 再試行で回復しうるエラーか
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    /// 画面に出す文言
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NotFound => "Product not found.",
            _ => "Something went wrong while loading the menu. Please try again.",
        }
    }
}

// ============================================
// 再試行
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 300,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay_ms: config.retry_base_delay_ms,
        }
    }

    /// `attempt` 回目（1始まり）が失敗した後の待ち時間
    pub fn delay_for(&self, attempt: u32) -> u32 {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay_ms.saturating_mul(1 << exponent)
    }

    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}

/// 一時的な失敗だけを指数バックオフで再試行する
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if policy.should_retry(&e, attempt) => {
                let delay = policy.delay_for(attempt);
                log::warn!(target: "api", "{} failed ({}), retrying in {}ms", label, e, delay);
                gloo::timers::future::TimeoutFuture::new(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

// ============================================
// レスポンス解析
// ============================================

fn envelope_key(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::Drink => "drinks",
        ProductKind::Meal => "meals",
    }
}

/// 文字列・数値どちらでも受け付け、空文字は無いものとする
fn text(item: &Value, key: &str) -> Option<String> {
    let s = match item.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn ingredients(item: &Value) -> Vec<Ingredient> {
    (1..=MAX_INGREDIENTS)
        .filter_map(|n| {
            let name = text(item, &format!("strIngredient{}", n))?;
            Some(Ingredient {
                name,
                measure: text(item, &format!("strMeasure{}", n)),
            })
        })
        .collect()
}

fn parse_item(kind: ProductKind, item: &Value) -> Option<Product> {
    let (id_key, name_key, thumb_key, origin_key) = match kind {
        ProductKind::Drink => ("idDrink", "strDrink", "strDrinkThumb", "strAlcoholic"),
        ProductKind::Meal => ("idMeal", "strMeal", "strMealThumb", "strArea"),
    };
    Some(Product {
        kind,
        id: text(item, id_key)?,
        name: text(item, name_key)?,
        thumb: text(item, thumb_key),
        category: text(item, "strCategory"),
        origin: text(item, origin_key),
        glass: text(item, "strGlass"),
        instructions: text(item, "strInstructions"),
        ingredients: ingredients(item),
    })
}

/// `{"drinks": [...]}` / `{"meals": [...]}` を商品一覧にする。
/// 配列以外（null や "no data found" など）は空、id か名前の無い要素は捨てる
pub fn parse_items(kind: ProductKind, body: &Value) -> Vec<Product> {
    match body.get(envelope_key(kind)) {
        Some(Value::Array(items)) => items.iter().filter_map(|item| parse_item(kind, item)).collect(),
        _ => Vec::new(),
    }
}

// ============================================
// エンドポイント
// ============================================

pub fn search_url(config: &AppConfig, kind: ProductKind, query: &str) -> String {
    format!(
        "{}/search.php?s={}",
        config.api_base(kind),
        crate::models::encode_component(query.trim())
    )
}

pub fn category_url(config: &AppConfig, category: Category) -> String {
    let base = config.api_base(category.kind());
    match category {
        Category::Coffee => format!("{}/filter.php?c=Coffee_/_Tea", base),
        Category::Drink => format!("{}/filter.php?a=Non_Alcoholic", base),
        Category::Beef | Category::Chicken | Category::Dessert => {
            format!("{}/filter.php?c={}", base, category.label())
        }
    }
}

pub fn lookup_url(config: &AppConfig, kind: ProductKind, id: &str) -> String {
    format!(
        "{}/lookup.php?i={}",
        config.api_base(kind),
        crate::models::encode_component(id.trim())
    )
}

/// 詳細の問い合わせ順。ヒントがあればそちらを先に
pub fn lookup_order(hint: Option<ProductKind>) -> [ProductKind; 2] {
    match hint {
        Some(ProductKind::Meal) => [ProductKind::Meal, ProductKind::Drink],
        _ => [ProductKind::Drink, ProductKind::Meal],
    }
}

/// 片方の API だけ失敗した場合は成功した側の結果を使う
pub fn merge_results(
    drinks: Result<Vec<Product>, FetchError>,
    meals: Result<Vec<Product>, FetchError>,
) -> Result<Vec<Product>, FetchError> {
    match (drinks, meals) {
        (Ok(mut d), Ok(m)) => {
            d.extend(m);
            Ok(d)
        }
        (Ok(d), Err(e)) | (Err(e), Ok(d)) => {
            log::warn!(target: "api", "partial search result: {}", e);
            Ok(d)
        }
        (Err(e), Err(_)) => Err(e),
    }
}

// ============================================
// HTTP
// ============================================

async fn fetch_json(url: &str) -> Result<Value, FetchError> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|e| FetchError::Network(format!("Request作成失敗: {:?}", e)))?;

    let window = web_sys::window().ok_or(FetchError::NoWindow)?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| FetchError::Network(format!("fetch失敗: {:?}", e)))?;

    let resp: Response = resp_value
        .dyn_into()
        .map_err(|_| FetchError::Decode("Responseへの変換失敗".to_string()))?;

    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }

    let json = JsFuture::from(resp.json().map_err(|e| FetchError::Decode(format!("json()失敗: {:?}", e)))?)
        .await
        .map_err(|e| FetchError::Decode(format!("JSON取得失敗: {:?}", e)))?;

    serde_wasm_bindgen::from_value::<Value>(json).map_err(|e| FetchError::Decode(format!("JSONパース失敗: {:?}", e)))
}

#[derive(Clone)]
pub struct MenuApi {
    config: Rc<AppConfig>,
    retry: RetryPolicy,
}

impl MenuApi {
    pub fn new(config: Rc<AppConfig>) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self { config, retry }
    }

    async fn fetch_items(&self, kind: ProductKind, url: String) -> Result<Vec<Product>, FetchError> {
        log::debug!(target: "api", "GET {}", url);
        let body = with_retry(self.retry, &url, || fetch_json(&url)).await?;
        Ok(parse_items(kind, &body))
    }

    /// ドリンクと料理を並行して検索する
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, FetchError> {
        let (drinks, meals) = futures::join!(
            self.fetch_items(ProductKind::Drink, search_url(&self.config, ProductKind::Drink, query)),
            self.fetch_items(ProductKind::Meal, search_url(&self.config, ProductKind::Meal, query)),
        );
        let results = merge_results(drinks, meals)?;
        log::info!(target: "api", "search {:?}: {} results", query, results.len());
        Ok(results)
    }

    pub async fn by_category(&self, category: Category) -> Result<Vec<Product>, FetchError> {
        let items = self
            .fetch_items(category.kind(), category_url(&self.config, category))
            .await?;
        log::info!(target: "api", "category {}: {} items", category.slug(), items.len());
        Ok(items)
    }

    /// id から詳細を引く。どちらの API にも無ければ `NotFound`
    pub async fn lookup(&self, id: &str, hint: Option<ProductKind>) -> Result<Product, FetchError> {
        let mut last_error = None;
        for kind in lookup_order(hint) {
            match self.fetch_items(kind, lookup_url(&self.config, kind, id)).await {
                Ok(items) => {
                    if let Some(product) = items.into_iter().next() {
                        return Ok(product);
                    }
                }
                Err(e) => {
                    log::warn!(target: "api", "lookup {} as {} failed: {}", id, kind, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(FetchError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "drinks": [{
                "idDrink": "11007",
                "strDrink": "Margarita",
                "strDrinkThumb": "https://example.com/m.jpg",
                "strCategory": "Ordinary Drink",
                "strAlcoholic": "Alcoholic",
                "strGlass": "Cocktail glass",
                "strInstructions": "Rub the rim of the glass with the lime slice.",
                "strIngredient1": "Tequila",
                "strMeasure1": "1 1/2 oz ",
                "strIngredient2": "Triple sec",
                "strMeasure2": null,
                "strIngredient3": "",
                "strIngredient4": null
            }]
        });
        let items = parse_items(ProductKind::Drink, &body);
        assert_eq!(items.len(), 1);
        let m = &items[0];
        assert_eq!(m.id, "11007");
        assert_eq!(m.name, "Margarita");
        assert_eq!(m.origin.as_deref(), Some("Alcoholic"));
        assert_eq!(
            m.ingredients,
            vec![
                Ingredient { name: "Tequila".to_string(), measure: Some("1 1/2 oz".to_string()) },
                Ingredient { name: "Triple sec".to_string(), measure: None },
            ]
        );
    }

    #[test]
    fn test_parse_non_array_envelopes() {
        assert!(parse_items(ProductKind::Meal, &json!({"meals": null})).is_empty());
        assert!(parse_items(ProductKind::Drink, &json!({"drinks": "no data found"})).is_empty());
        assert!(parse_items(ProductKind::Drink, &json!({})).is_empty());
        // 種別の違う封筒は読まない
        assert!(parse_items(ProductKind::Meal, &json!({"drinks": [{"idDrink": "1", "strDrink": "x"}]})).is_empty());
    }

    #[test]
    fn test_parse_filter_response_and_numeric_ids() {
        let body = json!({
            "meals": [
                {"idMeal": 52874, "strMeal": "Beef and Mustard Pie", "strMealThumb": "t"},
                {"idMeal": "", "strMeal": "No id"},
                {"idMeal": "52878"}
            ]
        });
        let items = parse_items(ProductKind::Meal, &body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "52874");
        assert_eq!(items[0].thumb.as_deref(), Some("t"));
        assert!(items[0].ingredients.is_empty());
    }

    #[test]
    fn test_category_urls() {
        let config = AppConfig::default();
        assert_eq!(
            category_url(&config, Category::Coffee),
            "https://www.thecocktaildb.com/api/json/v1/1/filter.php?c=Coffee_/_Tea"
        );
        assert_eq!(
            category_url(&config, Category::Drink),
            "https://www.thecocktaildb.com/api/json/v1/1/filter.php?a=Non_Alcoholic"
        );
        assert_eq!(
            category_url(&config, Category::Dessert),
            "https://www.themealdb.com/api/json/v1/1/filter.php?c=Dessert"
        );
    }

    #[test]
    fn test_search_and_lookup_urls_are_encoded() {
        let config = AppConfig::default();
        assert_eq!(
            search_url(&config, ProductKind::Meal, " beef & ale "),
            "https://www.themealdb.com/api/json/v1/1/search.php?s=beef%20%26%20ale"
        );
        assert_eq!(
            lookup_url(&config, ProductKind::Drink, "11007"),
            "https://www.thecocktaildb.com/api/json/v1/1/lookup.php?i=11007"
        );
    }

    #[test]
    fn test_lookup_order() {
        assert_eq!(lookup_order(None), [ProductKind::Drink, ProductKind::Meal]);
        assert_eq!(lookup_order(Some(ProductKind::Meal)), [ProductKind::Meal, ProductKind::Drink]);
    }

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::Network("offline".to_string()).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Decode("bad".to_string()).is_transient());
        assert!(!FetchError::NotFound.is_transient());
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), 300);
        assert_eq!(policy.delay_for(2), 600);
        assert_eq!(policy.delay_for(3), 1200);

        let offline = FetchError::Network("offline".to_string());
        assert!(policy.should_retry(&offline, 1));
        assert!(policy.should_retry(&offline, 2));
        assert!(!policy.should_retry(&offline, 3));
        assert!(!policy.should_retry(&FetchError::Status(400), 1));
    }

    #[test]
    fn test_merge_results_tolerates_one_failure() {
        let product = |kind, id: &str| Product {
            kind,
            id: id.to_string(),
            name: id.to_string(),
            thumb: None,
            category: None,
            origin: None,
            glass: None,
            instructions: None,
            ingredients: Vec::new(),
        };
        let merged = merge_results(
            Ok(vec![product(ProductKind::Drink, "d")]),
            Ok(vec![product(ProductKind::Meal, "m")]),
        )
        .unwrap();
        assert_eq!(merged.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["d", "m"]);

        let partial = merge_results(Err(FetchError::Status(500)), Ok(vec![product(ProductKind::Meal, "m")])).unwrap();
        assert_eq!(partial.len(), 1);

        let failed = merge_results(Err(FetchError::Status(500)), Err(FetchError::NoWindow));
        assert_eq!(failed, Err(FetchError::Status(500)));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(FetchError::NotFound.user_message(), "Product not found.");
        assert_ne!(FetchError::Status(500).user_message(), FetchError::NotFound.user_message());
    }
}
