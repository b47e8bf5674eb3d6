//! 下部ナビゲーション

use leptos::*;

use crate::models::NavSection;
use crate::store::use_favorites;
use crate::AppContext;

#[component]
pub fn NavBar() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();
    let route = ctx.route;

    view! {
        <nav class="bottom-nav">
            {NavSection::ALL.into_iter().map(|section| {
                let ctx = ctx.clone();
                let is_active = move || route.with(|r| r.section() == Some(section));
                view! {
                    <button
                        class=move || if is_active() { "nav-item active" } else { "nav-item" }
                        aria-current=move || is_active().then_some("page")
                        on:click=move |_| ctx.navigate(section.route())
                    >
                        <span class="nav-icon">{section.icon()}</span>
                        <span class="nav-label">{section.label()}</span>
                        // お気に入り件数バッジ
                        {(section == NavSection::Favorites).then(|| view! {
                            <Show when=move || { favorites.count() > 0 }>
                                <span class="nav-badge">{move || favorites.count()}</span>
                            </Show>
                        })}
                    </button>
                }
            }).collect_view()}
        </nav>
    }
}
