//! 変更通知（publish / subscribe）
//!
//! 同一タブ内の通知と、他タブからの通知を別々のトランスポートとして実装し、
//! `ChangeBroadcast` で1つのインターフェースにまとめる。
//!
//! - `WindowEvents`: window 上の CustomEvent（同一タブ）
//! - `StorageEvents`: ネイティブの `storage` イベント（他タブ。書き込んだタブには届かない）
//! - `LocalBus`: Rust 内だけで完結するバス（テスト、window が無い環境用）

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// 通知トピック
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Favorites,
    RecentSearches,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Favorites, Topic::RecentSearches];

    /// 同一タブ内で発火する CustomEvent 名
    pub fn event_name(&self) -> &'static str {
        match self {
            Topic::Favorites => "favorites-updated",
            Topic::RecentSearches => "recent-searches-updated",
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            Topic::Favorites => "favorites_v1",
            Topic::RecentSearches => "recent_searches_v1",
        }
    }

    /// `favorites_v1_rev` などの付随キーも同じトピックとして扱う
    pub fn from_storage_key(key: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|t| key.starts_with(t.storage_key()))
    }
}

/// `storage` イベントが指定トピックに関係するか。key が無いのは clear() による全消去
pub fn storage_event_matches(topic: Topic, key: Option<&str>) -> bool {
    match key {
        None => true,
        Some(k) => Topic::from_storage_key(k) == Some(topic),
    }
}

pub type Handler = Rc<dyn Fn(Topic)>;

/// 購読ハンドル。drop で購読解除
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// 複数の購読を1つにまとめる
    pub fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// 通知の配送経路
pub trait ChangeTransport {
    fn publish(&self, topic: Topic);
    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription;
}

// ============================================
// LocalBus
// ============================================

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: Vec<(u64, Topic, Handler)>,
}

/// プロセス内バス。publish は同期的に全購読者を呼ぶ
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Rc<RefCell<BusInner>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.inner.borrow().handlers.iter().filter(|(_, t, _)| *t == topic).count()
    }
}

impl ChangeTransport for LocalBus {
    fn publish(&self, topic: Topic) {
        // ハンドラ内で購読・解除されてもよいように、借用を外してから呼ぶ
        let targets: Vec<Handler> = self
            .inner
            .borrow()
            .handlers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in targets {
            handler(topic);
        }
    }

    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.push((id, topic, handler));
            id
        };
        let weak: Weak<RefCell<BusInner>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().handlers.retain(|(i, _, _)| *i != id);
            }
        })
    }
}

// ============================================
// ブラウザのイベント
// ============================================

/// window にリスナーを登録し、解除用の Subscription を返す
fn listen_window(event_name: &'static str, callback: Box<dyn FnMut(web_sys::Event)>) -> Subscription {
    let Some(window) = web_sys::window() else {
        return Subscription::empty();
    };
    let closure = Closure::wrap(callback);
    if window
        .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
        .is_err()
    {
        log::warn!(target: "broadcast", "failed to listen for {}", event_name);
        return Subscription::empty();
    }
    Subscription::new(move || {
        let _ = window.remove_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
        drop(closure);
    })
}

/// 同一タブ用: window 上の CustomEvent
pub struct WindowEvents;

impl ChangeTransport for WindowEvents {
    fn publish(&self, topic: Topic) {
        let Some(window) = web_sys::window() else {
            return;
        };
        match web_sys::CustomEvent::new(topic.event_name()) {
            Ok(event) => {
                let _ = window.dispatch_event(&event);
            }
            Err(e) => log::warn!(target: "broadcast", "CustomEvent作成失敗: {:?}", e),
        }
    }

    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        listen_window(topic.event_name(), Box::new(move |_: web_sys::Event| handler(topic)))
    }
}

/// 他タブ用: `storage` イベント（発火はブラウザが行うので publish は何もしない）
pub struct StorageEvents;

impl ChangeTransport for StorageEvents {
    fn publish(&self, _topic: Topic) {}

    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        listen_window(
            "storage",
            Box::new(move |event: web_sys::Event| {
                let key = event
                    .dyn_ref::<web_sys::StorageEvent>()
                    .and_then(|e| e.key());
                if storage_event_matches(topic, key.as_deref()) {
                    handler(topic);
                }
            }),
        )
    }
}

// ============================================
// ChangeBroadcast
// ============================================

/// 複数トランスポートをまとめた通知チャネル
pub struct ChangeBroadcast {
    transports: Vec<Rc<dyn ChangeTransport>>,
}

impl ChangeBroadcast {
    pub fn new(transports: Vec<Rc<dyn ChangeTransport>>) -> Self {
        Self { transports }
    }

    /// LocalBus のみ
    pub fn local(bus: LocalBus) -> Self {
        Self::new(vec![Rc::new(bus)])
    }

    /// ブラウザ用: 同一タブ + 他タブ
    pub fn browser() -> Self {
        if web_sys::window().is_some() {
            Self::new(vec![Rc::new(WindowEvents), Rc::new(StorageEvents)])
        } else {
            log::warn!(target: "broadcast", "no window, falling back to in-process bus");
            Self::local(LocalBus::new())
        }
    }
}

impl ChangeTransport for ChangeBroadcast {
    fn publish(&self, topic: Topic) {
        log::debug!(target: "broadcast", "publish {}", topic.event_name());
        for transport in &self.transports {
            transport.publish(topic);
        }
    }

    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let subscriptions = self
            .transports
            .iter()
            .map(|t| t.subscribe(topic, handler.clone()))
            .collect();
        Subscription::merge(subscriptions)
    }
}
