//! 商品詳細画面

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use super::LoadState;
use crate::components::{flash, ErrorMessage, Loading};
use crate::models::Product;
use crate::store::use_favorites;
use crate::AppContext;

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 99;

/// 注文確認トーストの表示時間
const TOAST_MS: u32 = 2000;

/// 数量を 1..=99 に収める
pub fn clamp_quantity(value: i64) -> i64 {
    value.clamp(MIN_QUANTITY, MAX_QUANTITY)
}

/// 数量入力欄の文字列を解釈する。数値でなければ現在値のまま
pub fn parse_quantity(input: &str, current: i64) -> i64 {
    input
        .trim()
        .parse::<i64>()
        .map(clamp_quantity)
        .unwrap_or(current)
}

#[component]
pub fn ProductDetailView(id: String) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let (state, set_state) = create_signal(LoadState::<Product>::Loading);

    // お気に入りに種別が残っていれば、その API から先に引く
    let hint = ctx
        .favorites
        .read()
        .iter()
        .find(|e| e.id == id)
        .and_then(|e| e.kind);

    let api = ctx.api.clone();
    spawn_local(async move {
        let result = api.lookup(&id, hint).await;
        match &result {
            Ok(product) => log::info!(target: "api", "loaded {} {} ({})", product.kind, product.id, product.name),
            Err(e) => log::warn!(target: "api", "lookup {} failed: {}", id, e),
        }
        let _ = set_state.try_set(LoadState::from_result(result));
    });

    let back = {
        let ctx = ctx.clone();
        move |_: web_sys::MouseEvent| ctx.back()
    };
    let back_from_error = back.clone();

    view! {
        <section class="product-detail-view">
            <button class="back-button" on:click=back>"← Back"</button>
            {move || match state.get() {
                LoadState::Idle | LoadState::Loading => view! { <Loading /> }.into_view(),
                LoadState::Failed(message) => view! {
                    <ErrorMessage message=message />
                    <button class="secondary" on:click=back_from_error.clone()>"Back to menu"</button>
                }.into_view(),
                LoadState::Loaded(product) => view! { <ProductDetail product=product /> }.into_view(),
            }}
        </section>
    }
}

#[component]
fn ProductDetail(product: Product) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();
    let (quantity, set_quantity) = create_signal(MIN_QUANTITY);
    let (flashing, set_flashing) = create_signal(false);
    let (toast, set_toast) = create_signal(None::<String>);
    let (error, set_error) = create_signal(None::<String>);

    let price = ctx.config.prices.for_kind(product.kind).to_string();
    let entry = product.to_favorite(&price);
    let id = product.id.clone();
    let name = product.name.clone();

    let on_toggle = move |_: web_sys::MouseEvent| {
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

    let on_add = {
        let name = name.clone();
        move |_: web_sys::MouseEvent| {
            let qty = quantity.get_untracked();
            log::info!(target: "order", "added {} x {}", qty, name);
            set_toast.set(Some(format!("Added {} × {} to your order", qty, name)));
            spawn_local(async move {
                gloo::timers::future::TimeoutFuture::new(TOAST_MS).await;
                let _ = set_toast.try_set(None);
            });
        }
    };

    let badges: Vec<String> = [&product.category, &product.origin, &product.glass]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let description = format!(
        "A {} from our {} menu.",
        product.kind.noun(),
        product.category.clone().unwrap_or_else(|| product.kind.as_str().to_string()).to_lowercase()
    );

    view! {
        <article class=move || if flashing.get() { "product-detail flash" } else { "product-detail" }>
            {product.thumb.clone().map(|src| view! {
                <img class="product-hero" src=src alt=name.clone() />
            })}
            <header class="product-header">
                <h2>{product.name.clone()}</h2>
                <button
                    class=move || if favorites.is_favorite(&id) { "fav-button active" } else { "fav-button" }
                    on:click=on_toggle
                >
                    {
                        let id = product.id.clone();
                        move || if favorites.is_favorite(&id) { "♥ Favorited" } else { "♡ Add to favorites" }
                    }
                </button>
            </header>
            <p class="product-description">{description}</p>
            <div class="badges">
                {badges.into_iter().map(|b| view! { <span class="badge">{b}</span> }).collect_view()}
            </div>
            <p class="product-price">"$" {price.clone()}</p>
            {move || error.get().map(|msg| view! { <span class="card-error">{msg}</span> })}

            {(!product.ingredients.is_empty()).then(|| view! {
                <section class="ingredients">
                    <h3>"Ingredients"</h3>
                    <ul>
                        {product.ingredients.iter().map(|i| view! {
                            <li>
                                <span class="ingredient-name">{i.name.clone()}</span>
                                {i.measure.clone().map(|m| view! { <span class="ingredient-measure">{m}</span> })}
                            </li>
                        }).collect_view()}
                    </ul>
                </section>
            })}

            {product.instructions.clone().map(|text| view! {
                <section class="instructions">
                    <h3>"Instructions"</h3>
                    <p>{text}</p>
                </section>
            })}

            <div class="order-row">
                <div class="quantity-stepper">
                    <button
                        disabled=move || quantity.get() <= MIN_QUANTITY
                        on:click=move |_| set_quantity.update(|q| *q = clamp_quantity(*q - 1))
                    >"−"</button>
                    <input
                        type="number"
                        min=MIN_QUANTITY
                        max=MAX_QUANTITY
                        prop:value=move || quantity.get().to_string()
                        on:change=move |ev| {
                            let value = event_target_value(&ev);
                            set_quantity.update(|q| *q = parse_quantity(&value, *q));
                        }
                    />
                    <button
                        disabled=move || quantity.get() >= MAX_QUANTITY
                        on:click=move |_| set_quantity.update(|q| *q = clamp_quantity(*q + 1))
                    >"+"</button>
                </div>
                <button class="primary" on:click=on_add>"Add to order"</button>
            </div>
            {move || toast.get().map(|msg| view! { <div class="toast" role="status">{msg}</div> })}
        </article>
    }
}
