//! データ構造体モジュール

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================
// 商品種別・カテゴリ
// ============================================

/// 商品の出所（ドリンクAPI / 料理API）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Drink,
    Meal,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Drink => "drink",
            ProductKind::Meal => "meal",
        }
    }

    /// 詳細画面の説明文で使う呼び名
    pub fn noun(&self) -> &'static str {
        match self {
            ProductKind::Drink => "beverage",
            ProductKind::Meal => "dish",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drink" => Ok(ProductKind::Drink),
            "meal" => Ok(ProductKind::Meal),
            _ => Err(()),
        }
    }
}

/// ホーム画面のカテゴリタブ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Coffee,
    Drink,
    Beef,
    Chicken,
    Dessert,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Coffee,
        Category::Drink,
        Category::Beef,
        Category::Chicken,
        Category::Dessert,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Category::Coffee => "coffee",
            Category::Drink => "drink",
            Category::Beef => "beef",
            Category::Chicken => "chicken",
            Category::Dessert => "dessert",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Coffee => "Coffee",
            Category::Drink => "Drink",
            Category::Beef => "Beef",
            Category::Chicken => "Chicken",
            Category::Dessert => "Dessert",
        }
    }

    /// どちらのAPIから取得するか
    pub fn kind(&self) -> ProductKind {
        match self {
            Category::Coffee | Category::Drink => ProductKind::Drink,
            Category::Beef | Category::Chicken | Category::Dessert => ProductKind::Meal,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_ascii_lowercase();
        Category::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

// ============================================
// お気に入り
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("favorite entry requires a non-empty id")]
    MissingId,
}

/// お気に入り1件（商品の最小限の写し）
///
/// `id` は必須。保存済みデータの数値IDも文字列として読み込む。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFavoriteEntry")]
pub struct FavoriteEntry {
    pub id: String,
    pub name: Option<String>,
    pub img: Option<String>,
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProductKind>,
}

impl FavoriteEntry {
    pub fn new(id: impl Into<String>) -> Result<Self, EntryError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(EntryError::MissingId);
        }
        Ok(Self {
            id,
            name: None,
            img: None,
            price: None,
            kind: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_img(mut self, img: impl Into<String>) -> Self {
        self.img = Some(img.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_kind(mut self, kind: ProductKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled")
    }
}

/// JSON上のスカラー値（文字列・数値の両方を受け付ける）
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawFavoriteEntry {
    #[serde(default)]
    id: Option<Scalar>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    img: Option<String>,
    #[serde(default)]
    price: Option<Scalar>,
    #[serde(default)]
    kind: Option<String>,
}

impl TryFrom<RawFavoriteEntry> for FavoriteEntry {
    type Error = EntryError;

    fn try_from(raw: RawFavoriteEntry) -> Result<Self, Self::Error> {
        let id = raw.id.map(Scalar::into_string).ok_or(EntryError::MissingId)?;
        let mut entry = FavoriteEntry::new(id)?;
        entry.name = raw.name;
        entry.img = raw.img;
        entry.price = raw.price.map(Scalar::into_string);
        entry.kind = raw.kind.and_then(|k| k.parse().ok());
        Ok(entry)
    }
}

/// お気に入り一覧（新しい順、IDは一意）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FavoritesList(Vec<FavoriteEntry>);

impl FavoritesList {
    /// 重複IDは先に現れたものを残す
    pub fn new(entries: Vec<FavoriteEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        Self(entries)
    }

    /// 保存値の読み込み。壊れたデータは空一覧、不正な要素は読み飛ばす
    pub fn from_json(raw: &str) -> Self {
        let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(raw) else {
            return Self::default();
        };
        let entries = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<FavoriteEntry>(item).ok())
            .collect();
        Self::new(entries)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        let id = id.trim();
        self.0.iter().any(|e| e.id == id)
    }

    pub fn ids(&self) -> HashSet<String> {
        self.0.iter().map(|e| e.id.clone()).collect()
    }

    /// 同じIDがあれば削除、なければ先頭に追加した新しい一覧を返す
    pub fn toggled(&self, entry: &FavoriteEntry) -> Self {
        if self.contains(&entry.id) {
            Self(self.0.iter().filter(|e| e.id != entry.id).cloned().collect())
        } else {
            let mut entries = Vec::with_capacity(self.0.len() + 1);
            entries.push(entry.clone());
            entries.extend(self.0.iter().cloned());
            Self(entries)
        }
    }

    pub fn entries(&self) -> &[FavoriteEntry] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &FavoriteEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<FavoriteEntry> {
        self.0
    }
}

// ============================================
// 商品（API取得結果）
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub name: String,
    pub measure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub kind: ProductKind,
    pub id: String,
    pub name: String,
    pub thumb: Option<String>,
    pub category: Option<String>,
    /// 料理は地域、ドリンクはアルコール区分
    pub origin: Option<String>,
    pub glass: Option<String>,
    pub instructions: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl Product {
    pub fn to_favorite(&self, price: &str) -> Result<FavoriteEntry, EntryError> {
        let mut entry = FavoriteEntry::new(self.id.clone())?
            .with_name(self.name.clone())
            .with_price(price)
            .with_kind(self.kind);
        entry.img = self.thumb.clone();
        Ok(entry)
    }
}

/// 検索結果の種別フィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    All,
    Drinks,
    Meals,
}

impl ResultFilter {
    pub const ALL: [ResultFilter; 3] = [ResultFilter::All, ResultFilter::Drinks, ResultFilter::Meals];

    pub fn label(&self) -> &'static str {
        match self {
            ResultFilter::All => "All",
            ResultFilter::Drinks => "Drinks",
            ResultFilter::Meals => "Meals",
        }
    }

    pub fn matches(&self, kind: ProductKind) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Drinks => kind == ProductKind::Drink,
            ResultFilter::Meals => kind == ProductKind::Meal,
        }
    }
}

// ============================================
// ルート（ハッシュルーティング）
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    Home(Option<Category>),
    Search { query: String },
    Product { id: String },
    Favorites,
    Profile,
}

impl Default for Route {
    fn default() -> Self {
        Route::Start
    }
}

/// 下部ナビゲーションの区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSection {
    Home,
    Search,
    Favorites,
    Profile,
}

impl NavSection {
    pub const ALL: [NavSection; 4] = [
        NavSection::Home,
        NavSection::Search,
        NavSection::Favorites,
        NavSection::Profile,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NavSection::Home => "Home",
            NavSection::Search => "Search",
            NavSection::Favorites => "Favorites",
            NavSection::Profile => "Profile",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NavSection::Home => "🏠",
            NavSection::Search => "🔍",
            NavSection::Favorites => "♥",
            NavSection::Profile => "👤",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            NavSection::Home => Route::Home(None),
            NavSection::Search => Route::Search { query: String::new() },
            NavSection::Favorites => Route::Favorites,
            NavSection::Profile => Route::Profile,
        }
    }
}

impl Route {
    /// `location.hash` の値を解析する。不明なパスはスタート画面
    pub fn parse(hash: &str) -> Self {
        let raw = hash.trim_start_matches('#').trim_start_matches('/');
        let (path, query) = match raw.split_once('?') {
            Some((p, q)) => (p, q),
            None => (raw, ""),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let head = segments.first().map(|s| s.to_ascii_lowercase());

        match (head.as_deref(), segments.get(1)) {
            (None, _) => Route::Start,
            (Some("home"), None) => Route::Home(None),
            (Some("home"), Some(slug)) => Route::Home(Category::from_slug(slug)),
            (Some("search"), _) => Route::Search {
                query: query_param(query, "q").unwrap_or_default(),
            },
            (Some("product"), Some(id)) => {
                let id = decode_component(id);
                if id.trim().is_empty() {
                    Route::Start
                } else {
                    Route::Product { id }
                }
            }
            (Some("favorites"), _) => Route::Favorites,
            (Some("profile"), _) => Route::Profile,
            _ => Route::Start,
        }
    }

    pub fn to_hash(&self) -> String {
        match self {
            Route::Start => "#/".to_string(),
            Route::Home(None) => "#/home".to_string(),
            Route::Home(Some(c)) => format!("#/home/{}", c.slug()),
            Route::Search { query } if query.trim().is_empty() => "#/search".to_string(),
            Route::Search { query } => format!("#/search?q={}", encode_component(query)),
            Route::Product { id } => format!("#/product/{}", encode_component(id)),
            Route::Favorites => "#/favorites".to_string(),
            Route::Profile => "#/profile".to_string(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Route::Start => "Café Menu".to_string(),
            Route::Home(None) => "Café Home".to_string(),
            Route::Home(Some(c)) => format!("{} - Café Menu", c.label()),
            Route::Search { .. } => "Search - Café Menu".to_string(),
            Route::Product { .. } => "Product - Café Menu".to_string(),
            Route::Favorites => "Your Favorites - Café Menu".to_string(),
            Route::Profile => "Café Profile".to_string(),
        }
    }

    pub fn section(&self) -> Option<NavSection> {
        match self {
            Route::Start => None,
            Route::Home(_) | Route::Product { .. } => Some(NavSection::Home),
            Route::Search { .. } => Some(NavSection::Search),
            Route::Favorites => Some(NavSection::Favorites),
            Route::Profile => Some(NavSection::Profile),
        }
    }

    /// 画面を作り直すかどうかの判定用。検索語とカテゴリは画面内の状態として扱う
    pub fn view_key(&self) -> Route {
        match self {
            Route::Home(_) => Route::Home(None),
            Route::Search { .. } => Route::Search { query: String::new() },
            other => other.clone(),
        }
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| decode_component(v))
}

/// encodeURIComponent 相当（英数字と `-_.~` 以外をエスケープ）
pub fn encode_component(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// パーセントデコード（`+` は空白扱い、不正な並びはそのまま残す）
pub fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
