//! お気に入り画面

use leptos::*;

use crate::models::{FavoriteEntry, Route};
use crate::store::{use_favorites, FavoritesHandle};
use crate::AppContext;

/// 全件削除の確認。window が無い環境では確認なしで進める
fn confirm_clear(count: usize) -> bool {
    let message = format!("Remove all {} favorites?", count);
    web_sys::window()
        .map(|w| w.confirm_with_message(&message).unwrap_or(false))
        .unwrap_or(true)
}

#[component]
pub fn FavoritesView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();
    let (error, set_error) = create_signal(None::<String>);

    let on_clear = move |_: web_sys::MouseEvent| {
        let count = favorites.count();
        // 空のときは確認も書き込みもしない
        if count == 0 || !confirm_clear(count) {
            return;
        }
        match favorites.clear() {
            Ok(_) => set_error.set(None),
            Err(e) => set_error.set(Some(format!("Couldn't clear favorites: {}", e))),
        }
    };

    let explore = move |_: web_sys::MouseEvent| ctx.navigate(Route::Home(None));

    view! {
        <section class="favorites-view">
            <header class="view-header">
                <h2>"Your Favorites"</h2>
                <span class="count-badge">{move || favorites.count()}</span>
                <button
                    class="danger"
                    disabled=move || favorites.count() == 0
                    on:click=on_clear
                >
                    "Clear all"
                </button>
            </header>
            {move || error.get().map(|msg| view! { <p class="error-message">{msg}</p> })}

            <Show
                when=move || { favorites.count() > 0 }
                fallback=move || view! {
                    <div class="empty-state">
                        <p>"No favorites yet."</p>
                        <p class="hint">"Tap the heart on anything you like and it will show up here."</p>
                        <button class="primary" on:click=explore.clone()>"Explore menu"</button>
                    </div>
                }
            >
                <ul class="favorites-list">
                    <For
                        each=move || favorites.list.get().into_vec()
                        key=|entry: &FavoriteEntry| entry.id.clone()
                        children=move |entry: FavoriteEntry| {
                            view! { <FavoriteRow entry=entry favorites=favorites set_error=set_error /> }
                        }
                    />
                </ul>
            </Show>
        </section>
    }
}

#[component]
fn FavoriteRow(
    entry: FavoriteEntry,
    favorites: FavoritesHandle,
    set_error: WriteSignal<Option<String>>,
) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let id = entry.id.clone();
    let name = entry.display_name().to_string();

    let on_details = move |_: web_sys::MouseEvent| ctx.navigate(Route::Product { id: id.clone() });
    let on_remove = {
        let entry = entry.clone();
        move |_: web_sys::MouseEvent| {
            if let Err(e) = favorites.toggle(&entry) {
                set_error.set(Some(format!("Couldn't remove {}: {}", entry.display_name(), e)));
            }
        }
    };

    view! {
        <li class="favorite-row">
            {entry.img.clone().map(|src| view! {
                <img class="product-thumb" src=src alt=name.clone() loading="lazy" />
            })}
            <div class="product-info">
                <h4 class="product-name">{name.clone()}</h4>
                {entry.kind.map(|k| view! { <span class="product-kind">{k.as_str()}</span> })}
                {entry.price.clone().map(|p| view! { <span class="product-price">"$" {p}</span> })}
            </div>
            <div class="row-actions">
                <button class="secondary" on:click=on_details>"View details"</button>
                <button class="danger" on:click=on_remove>"Remove"</button>
            </div>
        </li>
    }
}
