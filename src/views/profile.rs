//! プロフィール画面（店舗紹介・統計・ログ操作）

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use crate::models::Category;
use crate::store::use_favorites;
use crate::utils::{build_time_label, log_trace};
use crate::AppContext;

#[component]
pub fn ProfileView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();

    let (recent_count, set_recent_count) = create_signal(ctx.recent.read().len());
    let subscription = {
        let recent = ctx.recent.clone();
        ctx.recent.subscribe(move || {
            let _ = set_recent_count.try_set(recent.read().len());
        })
    };
    on_cleanup(move || drop(subscription));

    let (log_count, set_log_count) = create_signal(log_trace::log_count());
    let (log_status, set_log_status) = create_signal(None::<String>);

    let on_download = move |_: web_sys::MouseEvent| {
        log_trace::download_logs();
        set_log_count.set(log_trace::log_count());
    };

    let on_copy = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            let status = match log_trace::copy_logs_to_clipboard_async().await {
                Ok(()) => "Log copied to clipboard.".to_string(),
                Err(e) => e,
            };
            let _ = set_log_status.try_set(Some(status));
            let _ = set_log_count.try_set(log_trace::log_count());
        });
    };

    let on_clear_logs = move |_: web_sys::MouseEvent| {
        log_trace::clear_logs();
        set_log_count.set(log_trace::log_count());
        set_log_status.set(Some("Log cleared.".to_string()));
    };

    view! {
        <section class="profile-view">
            <header class="view-header">
                <h2>"About the Café"</h2>
            </header>
            <p class="blurb">
                "We brew single-origin coffee, shake up alcohol-free drinks and serve "
                "comfort food all day. Save the things you love and find them again here."
            </p>

            <dl class="stats">
                <div>
                    <dt>"Menu categories"</dt>
                    <dd>{Category::ALL.len()}</dd>
                </div>
                <div>
                    <dt>"Favorites"</dt>
                    <dd>{move || favorites.count()}</dd>
                </div>
                <div>
                    <dt>"Recent searches"</dt>
                    <dd>{move || recent_count.get()}</dd>
                </div>
            </dl>

            <section class="log-tools">
                <h3>"Diagnostics"</h3>
                <p class="hint">{move || format!("{} log entries recorded", log_count.get())}</p>
                <div class="row-actions">
                    <button class="secondary" on:click=on_download>"Download log"</button>
                    <button class="secondary" on:click=on_copy>"Copy log"</button>
                    <button class="danger" on:click=on_clear_logs>"Clear log"</button>
                </div>
                {move || log_status.get().map(|msg| view! { <p class="status">{msg}</p> })}
            </section>

            <footer class="build-info">{build_time_label()}</footer>
        </section>
    }
}
