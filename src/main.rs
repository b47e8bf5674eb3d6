use std::rc::Rc;

use leptos::*;
use wasm_bindgen::prelude::*;

mod components;
mod models;
mod store;
mod utils;
mod views;

use components::NavBar;
use models::Route;
use store::{ChangeBroadcast, ChangeTransport, FavoritesStore, KeyValueStorage, RecentSearches};
use utils::api::MenuApi;
use utils::config::AppConfig;
use views::{FavoritesView, HomeView, ProductDetailView, ProfileView, SearchView, StartView};

// ============================================
// アプリ全体で共有する状態
// ============================================

#[derive(Clone)]
pub struct AppContext {
    pub route: ReadSignal<Route>,
    set_route: WriteSignal<Route>,
    pub favorites: Rc<FavoritesStore>,
    pub recent: Rc<RecentSearches>,
    pub api: MenuApi,
    pub config: Rc<AppConfig>,
}

impl AppContext {
    /// 履歴を積んで画面遷移（hashchange 経由で route が更新される）
    pub fn navigate(&self, route: Route) {
        log::debug!(target: "router", "navigate {}", route.to_hash());
        let pushed = web_sys::window()
            .map(|w| w.location().set_hash(&route.to_hash()).is_ok())
            .unwrap_or(false);
        if !pushed {
            self.set_route_if_changed(route);
        }
    }

    /// 履歴を積まずに URL だけ書き換える（検索語の反映用）
    pub fn replace_url(&self, route: &Route) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            return;
        };
        if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(&route.to_hash())) {
            log::warn!(target: "router", "replaceState失敗: {:?}", e);
        }
    }

    /// 戻る。履歴が無ければホームへ
    pub fn back(&self) {
        let went_back = web_sys::window()
            .and_then(|w| w.history().ok())
            .filter(|h| h.length().unwrap_or(0) > 1)
            .map(|h| h.back().is_ok())
            .unwrap_or(false);
        if !went_back {
            self.navigate(Route::Home(None));
        }
    }

    fn set_route_if_changed(&self, route: Route) {
        if self.route.get_untracked() != route {
            self.set_route.set(route);
        }
    }
}

/// 現在の `location.hash` を解析
fn current_route() -> Route {
    web_sys::window()
        .and_then(|w| w.location().hash().ok())
        .map(|hash| Route::parse(&hash))
        .unwrap_or_default()
}

fn set_document_title(title: &str) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        document.set_title(title);
    }
}

/// ブラウザの戻る・進むや手入力の URL を route に反映する
fn listen_hash_changes(ctx: AppContext) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let on_hash_change = Closure::wrap(Box::new(move |_: web_sys::Event| {
        let route = current_route();
        log::debug!(target: "router", "hashchange {}", route.to_hash());
        ctx.set_route_if_changed(route);
    }) as Box<dyn FnMut(_)>);

    if window
        .add_event_listener_with_callback("hashchange", on_hash_change.as_ref().unchecked_ref())
        .is_err()
    {
        log::warn!(target: "router", "failed to listen for hashchange");
    }
    // アプリと同じ寿命
    on_hash_change.forget();
}

// ============================================
// App
// ============================================

#[component]
fn App(storage: Rc<dyn KeyValueStorage>, config: Rc<AppConfig>) -> impl IntoView {
    let broadcast: Rc<dyn ChangeTransport> = Rc::new(ChangeBroadcast::browser());
    let (route, set_route) = create_signal(current_route());

    let ctx = AppContext {
        route,
        set_route,
        favorites: Rc::new(FavoritesStore::new(storage.clone(), broadcast.clone())),
        recent: Rc::new(RecentSearches::new(storage, broadcast, config.recent_limit)),
        api: MenuApi::new(config.clone()),
        config,
    };
    provide_context(ctx.clone());
    listen_hash_changes(ctx);

    create_effect(move |_| {
        let route = route.get();
        set_document_title(&route.title());
        log::info!(target: "router", "view {}", route.to_hash());
    });

    // 検索語・カテゴリの変更では画面を作り直さない
    let page = create_memo(move |_| route.with(Route::view_key));

    view! {
        <div class="app">
            <main class="container">
                {move || match page.get() {
                    Route::Start => view! { <StartView /> }.into_view(),
                    Route::Home(_) => view! { <HomeView /> }.into_view(),
                    Route::Search { .. } => view! { <SearchView /> }.into_view(),
                    Route::Product { id } => view! { <ProductDetailView id=id /> }.into_view(),
                    Route::Favorites => view! { <FavoritesView /> }.into_view(),
                    Route::Profile => view! { <ProfileView /> }.into_view(),
                }}
            </main>
            <NavBar />
        </div>
    }
}

fn main() {
    console_error_panic_hook::set_once();

    let storage = store::storage::open_default();
    let config = Rc::new(AppConfig::load(storage.as_ref()));
    if let Err(e) = utils::log_trace::init(config.log_level()) {
        web_sys::console::warn_1(&format!("logger already set: {}", e).into());
    }
    log::info!(target: "app", "cafe menu starting ({})", utils::build_time_label());

    mount_to_body(move || view! { <App storage=storage config=config /> });
}
