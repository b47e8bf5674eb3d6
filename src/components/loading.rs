//! 読み込み中・エラー表示

use leptos::*;

#[component]
pub fn Loading(#[prop(default = "Loading…")] label: &'static str) -> impl IntoView {
    view! {
        <div class="loading" role="status">
            <span class="spinner"></span>
            <span class="loading-label">{label}</span>
        </div>
    }
}

#[component]
pub fn ErrorMessage(message: String) -> impl IntoView {
    view! {
        <div class="error-message" role="alert">
            <span class="error-icon">"!"</span>
            {message}
        </div>
    }
}
