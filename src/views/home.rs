//! ホーム画面（検索フォーム + カテゴリ別一覧）

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use super::LoadState;
use crate::components::{ErrorMessage, Loading, ProductCard};
use crate::models::{Category, Product, Route};
use crate::store::use_favorites;
use crate::AppContext;

/// タブ未選択時に表示するカテゴリ
const DEFAULT_CATEGORY: Category = Category::Coffee;

#[component]
pub fn HomeView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let (query, set_query) = create_signal(String::new());

    let route = ctx.route;
    // ホーム以外へ遷移する瞬間に一覧を作り直さないよう、直前の値を保つ
    let category = create_memo(move |prev: Option<&Category>| match route.get() {
        Route::Home(Some(c)) => c,
        Route::Home(None) => DEFAULT_CATEGORY,
        _ => prev.copied().unwrap_or(DEFAULT_CATEGORY),
    });

    let on_submit = {
        let ctx = ctx.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            let q = query.get_untracked().trim().to_string();
            if q.is_empty() {
                return;
            }
            if let Err(e) = ctx.recent.record(&q) {
                log::warn!(target: "search", "failed to record recent search: {}", e);
            }
            ctx.navigate(Route::Search { query: q });
        }
    };

    view! {
        <section class="home-view">
            <header class="view-header">
                <h2>"Our Menu"</h2>
            </header>

            <form class="search-form" on:submit=on_submit>
                <input
                    type="search"
                    placeholder="Search drinks and dishes"
                    prop:value=move || query.get()
                    on:input=move |ev| set_query.set(event_target_value(&ev))
                />
                <button type="submit">"Search"</button>
            </form>

            <nav class="category-tabs">
                {Category::ALL.into_iter().map(|c| {
                    let ctx = ctx.clone();
                    view! {
                        <button
                            class=move || if category.get() == c { "tab active" } else { "tab" }
                            on:click=move |_| ctx.navigate(Route::Home(Some(c)))
                        >
                            {c.label()}
                        </button>
                    }
                }).collect_view()}
            </nav>

            // タブが変わるたびに一覧を作り直す
            {move || view! { <CategoryView category=category.get() /> }}
        </section>
    }
}

/// カテゴリ別の商品一覧
#[component]
pub fn CategoryView(category: Category) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();
    let (state, set_state) = create_signal(LoadState::<Vec<Product>>::Loading);
    let price = ctx.config.prices.for_category(category).to_string();

    let api = ctx.api.clone();
    spawn_local(async move {
        let result = api.by_category(category).await;
        if let Err(e) = &result {
            log::error!(target: "api", "category {} failed: {}", category.slug(), e);
        }
        // 画面が切り替わった後の応答は捨てる
        let _ = set_state.try_set(LoadState::from_result(result));
    });

    view! {
        <div class="category-view">
            <h3>{category.label()}</h3>
            {move || match state.get() {
                LoadState::Idle | LoadState::Loading => view! { <Loading /> }.into_view(),
                LoadState::Failed(message) => view! { <ErrorMessage message=message /> }.into_view(),
                LoadState::Loaded(items) if items.is_empty() => view! {
                    <p class="empty-state">"Nothing in this category right now."</p>
                }.into_view(),
                LoadState::Loaded(items) => {
                    let price = price.clone();
                    view! {
                        <div class="product-grid">
                            {items.into_iter().map(|product| view! {
                                <ProductCard product=product price=price.clone() favorites=favorites />
                            }).collect_view()}
                        </div>
                    }.into_view()
                }
            }}
        </div>
    }
}
