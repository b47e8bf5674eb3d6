//! 検索画面
//!
//! 入力はデバウンスして検索し、URL を履歴を積まずに書き換える。
//! 確定（Enter・候補選択）した語だけを最近の検索に記録する。

use std::rc::Rc;

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use super::LoadState;
use crate::components::{ErrorMessage, Loading, ProductCard};
use crate::models::{Product, ResultFilter, Route};
use crate::store::recent::suggestions;
use crate::store::use_favorites;
use crate::utils::debounce::{Debouncer, QueryGate};
use crate::AppContext;

#[component]
pub fn SearchView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let favorites = use_favorites();

    let initial = match ctx.route.get_untracked() {
        Route::Search { query } => query,
        _ => String::new(),
    };
    let (query, set_query) = create_signal(initial.clone());
    let (results, set_results) = create_signal(LoadState::<Vec<Product>>::Idle);
    let (filter, set_filter) = create_signal(ResultFilter::All);
    let (show_suggestions, set_show_suggestions) = create_signal(false);

    // 最近の検索（他の画面・タブでの変更も反映）
    let (recent, set_recent) = create_signal(ctx.recent.read());
    let recent_subscription = {
        let store = ctx.recent.clone();
        ctx.recent.subscribe(move || {
            let _ = set_recent.try_set(store.read());
        })
    };
    on_cleanup(move || drop(recent_subscription));

    let debouncer = Rc::new(Debouncer::new());
    let gate = Rc::new(QueryGate::new());
    // 画面を離れた後に予約済みの検索が URL を書き換えないようにする
    on_cleanup({
        let debouncer = debouncer.clone();
        move || debouncer.cancel()
    });

    // 実際の検索。直前と同じ語なら何もしない
    let run_search: Rc<dyn Fn(String)> = {
        let ctx = ctx.clone();
        let gate = gate.clone();
        Rc::new(move |q: String| {
            if !gate.admit(&q) {
                return;
            }
            ctx.replace_url(&Route::Search { query: q.clone() });
            set_results.set(LoadState::Loading);
            let api = ctx.api.clone();
            let gate = gate.clone();
            spawn_local(async move {
                let result = api.search(&q).await;
                // 新しい語の検索が始まっていれば古い応答は捨てる
                if !gate.is_latest(&q) {
                    log::debug!(target: "search", "dropping stale results for {:?}", q);
                    return;
                }
                if let Err(e) = &result {
                    log::error!(target: "search", "search {:?} failed: {}", q, e);
                }
                let _ = set_results.try_set(LoadState::from_result(result));
            });
        })
    };

    // 入力が空になったら結果と URL を戻す
    let reset: Rc<dyn Fn()> = {
        let ctx = ctx.clone();
        let debouncer = debouncer.clone();
        let gate = gate.clone();
        Rc::new(move || {
            debouncer.cancel();
            gate.reset();
            set_results.set(LoadState::Idle);
            ctx.replace_url(&Route::Search { query: String::new() });
        })
    };

    // 確定した語は記録して即検索
    let commit: Rc<dyn Fn(String)> = {
        let ctx = ctx.clone();
        let debouncer = debouncer.clone();
        let run_search = run_search.clone();
        Rc::new(move |q: String| {
            let q = q.trim().to_string();
            if q.is_empty() {
                return;
            }
            debouncer.cancel();
            set_show_suggestions.set(false);
            if let Err(e) = ctx.recent.record(&q) {
                log::warn!(target: "search", "failed to record recent search: {}", e);
            }
            run_search(q);
        })
    };

    let on_input = {
        let debouncer = debouncer.clone();
        let run_search = run_search.clone();
        let reset = reset.clone();
        let delay = ctx.config.debounce_ms;
        move |ev: web_sys::Event| {
            let value = event_target_value(&ev);
            set_query.set(value.clone());
            set_show_suggestions.set(true);
            let q = value.trim().to_string();
            if q.is_empty() {
                reset();
                return;
            }
            let run_search = run_search.clone();
            debouncer.run(delay, move || run_search(q));
        }
    };

    let on_submit = {
        let commit = commit.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            commit(query.get_untracked());
        }
    };

    let on_clear = {
        let reset = reset.clone();
        move |_: web_sys::MouseEvent| {
            set_query.set(String::new());
            set_show_suggestions.set(false);
            reset();
        }
    };

    let clear_history = {
        let ctx = ctx.clone();
        Callback::new(move |_: web_sys::MouseEvent| {
            if let Err(e) = ctx.recent.clear() {
                log::warn!(target: "search", "failed to clear recent searches: {}", e);
            }
        })
    };

    // 入力候補: 最近の検索 + 検索結果の名前
    let limit = ctx.config.suggestion_limit;
    let suggestion_list = create_memo(move |_| {
        let recent = recent.get();
        results.with(|state| match state {
            LoadState::Loaded(items) => suggestions(&recent, items.iter().map(|p| p.name.as_str()), limit),
            _ => suggestions(&recent, std::iter::empty(), limit),
        })
    });

    if !initial.trim().is_empty() {
        run_search(initial.trim().to_string());
    }

    let filtered = move || {
        results.with(|state| match state {
            LoadState::Loaded(items) => items
                .iter()
                .filter(|p| filter.get().matches(p.kind))
                .cloned()
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    };
    let count_for = move |f: ResultFilter| {
        results.with(|state| match state {
            LoadState::Loaded(items) => items.iter().filter(|p| f.matches(p.kind)).count(),
            _ => 0,
        })
    };

    let prices = ctx.config.prices.clone();

    view! {
        <section class="search-view">
            <header class="view-header">
                <h2>"Search"</h2>
            </header>

            <form class="search-form" on:submit=on_submit>
                <input
                    type="search"
                    placeholder="Latte, mojito, beef stew…"
                    autocomplete="off"
                    prop:value=move || query.get()
                    on:input=on_input
                    on:focus=move |_| set_show_suggestions.set(true)
                />
                <Show when=move || !query.with(|q| q.is_empty())>
                    <button type="button" class="clear-button" title="Clear" on:click=on_clear.clone()>"×"</button>
                </Show>
                <button type="submit">"Search"</button>
            </form>

            <Show when=move || show_suggestions.get() && !suggestion_list.with(|s| s.is_empty())>
                <ul class="suggestions">
                    {
                        let commit = commit.clone();
                        move || suggestion_list.get().into_iter().map(|s| {
                            let commit = commit.clone();
                            let chosen = s.clone();
                            view! {
                                <li>
                                    <button type="button" on:click=move |_| {
                                        set_query.set(chosen.clone());
                                        commit(chosen.clone());
                                    }>{s}</button>
                                </li>
                            }
                        }).collect_view()
                    }
                    <Show when=move || !recent.with(|r| r.is_empty())>
                        <li class="suggestions-footer">
                            <button type="button" class="link" on:click=move |ev| clear_history.call(ev)>"Clear recent searches"</button>
                        </li>
                    </Show>
                </ul>
            </Show>

            <nav class="filter-tabs">
                {ResultFilter::ALL.into_iter().map(|f| view! {
                    <button
                        class=move || if filter.get() == f { "tab active" } else { "tab" }
                        on:click=move |_| set_filter.set(f)
                    >
                        {f.label()} " (" {move || count_for(f)} ")"
                    </button>
                }).collect_view()}
            </nav>

            {move || match results.get() {
                LoadState::Idle => view! {
                    <p class="hint">"Start typing to search drinks and dishes."</p>
                }.into_view(),
                LoadState::Loading => view! { <Loading label="Searching…" /> }.into_view(),
                LoadState::Failed(message) => view! { <ErrorMessage message=message /> }.into_view(),
                LoadState::Loaded(_) => {
                    let items = filtered();
                    if items.is_empty() {
                        view! {
                            <div class="empty-state">
                                <p>"No results for “" {query.get_untracked().trim().to_string()} "”."</p>
                                <p class="hint">"Try another word or switch the filter."</p>
                            </div>
                        }.into_view()
                    } else {
                        let prices = prices.clone();
                        view! {
                            <div class="product-grid">
                                {items.into_iter().map(|product| {
                                    let price = prices.for_kind(product.kind).to_string();
                                    view! { <ProductCard product=product price=price favorites=favorites /> }
                                }).collect_view()}
                            </div>
                        }.into_view()
                    }
                }
            }}
        </section>
    }
}
