//! スタート画面

use leptos::*;

use crate::models::{Category, Route};
use crate::AppContext;

#[component]
pub fn StartView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let to_menu = ctx.clone();
    let to_drinks = ctx.clone();

    view! {
        <section class="start-view">
            <div class="hero">
                <h1>"Café Menu"</h1>
                <p class="tagline">"Fresh coffee, cold drinks and hearty plates, all in one place."</p>
            </div>
            <div class="start-actions">
                <button class="primary" on:click=move |_| to_menu.navigate(Route::Home(None))>
                    "View menu"
                </button>
                <button class="secondary" on:click=move |_| to_drinks.navigate(Route::Home(Some(Category::Drink)))>
                    "Browse drinks"
                </button>
                <button class="link" on:click=move |_| ctx.navigate(Route::Search { query: String::new() })>
                    "Search the menu"
                </button>
            </div>
        </section>
    }
}
