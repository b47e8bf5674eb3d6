//! 商品カードコンポーネント

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use crate::models::{Product, Route};
use crate::store::FavoritesHandle;
use crate::AppContext;

/// お気に入り切り替え時のハイライト時間
pub const FLASH_MS: u32 = 450;

/// 一定時間だけ true になる signal を立てる
pub fn flash(set_flag: WriteSignal<bool>) {
    set_flag.set(true);
    spawn_local(async move {
        gloo::timers::future::TimeoutFuture::new(FLASH_MS).await;
        // 画面が破棄されていたら何もしない
        let _ = set_flag.try_set(false);
    });
}

/// 一覧・検索結果用のカード
/// 画像・名前・価格を表示し、クリックで詳細へ遷移する
#[component]
pub fn ProductCard(product: Product, price: String, favorites: FavoritesHandle) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let (flashing, set_flashing) = create_signal(false);
    let (error, set_error) = create_signal(None::<String>);

    let id = product.id.clone();
    let is_favorite = {
        let id = id.clone();
        move || favorites.is_favorite(&id)
    };
    let entry = product.to_favorite(&price);
    let name = product.name.clone();

    let on_open = {
        let id = id.clone();
        move |_| ctx.navigate(Route::Product { id: id.clone() })
    };

    let on_toggle = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        let Ok(entry) = &entry else {
            return;
        };
        match favorites.toggle(entry) {
            Ok(_) => {
                set_error.set(None);
                flash(set_flashing);
            }
            Err(e) => set_error.set(Some(format!("Couldn't update favorites: {}", e))),
        }
    };

    let is_favorite_label = is_favorite.clone();
    let is_favorite_class = is_favorite.clone();

    view! {
        <div
            class=move || if flashing.get() { "product-card flash" } else { "product-card" }
            on:click=on_open
        >
            {product.thumb.clone().map(|src| view! {
                <img class="product-thumb" src=src alt=name.clone() loading="lazy" />
            })}
            <div class="product-info">
                <h4 class="product-name">{product.name.clone()}</h4>
                <span class="product-kind">{product.kind.as_str()}</span>
                <span class="product-price">"$" {price.clone()}</span>
            </div>
            <button
                class=move || if is_favorite_class() { "fav-button active" } else { "fav-button" }
                aria-pressed=move || is_favorite().to_string()
                title=move || if is_favorite_label() { "Remove from favorites" } else { "Add to favorites" }
                on:click=on_toggle
            >
                {move || if favorites.is_favorite(&id) { "♥" } else { "♡" }}
            </button>
            {move || error.get().map(|msg| view! { <span class="card-error">{msg}</span> })}
        </div>
    }
}
