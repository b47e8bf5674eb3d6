//! お気に入りの購読側
//!
//! 各画面はマウント時に一覧を読み込み、変更通知のたびに丸ごと読み直す。
//! 自分で toggle した時は戻り値で即座に表示を更新する（自分の通知は待たない）。

use std::cell::RefCell;
use std::rc::Rc;

use leptos::*;

use super::broadcast::Subscription;
use super::favorites::FavoritesStore;
use super::StoreError;
use crate::models::{FavoriteEntry, FavoritesList};
use crate::AppContext;

pub struct FavoritesObserver {
    store: Rc<FavoritesStore>,
    view: Rc<RefCell<FavoritesList>>,
    subscription: RefCell<Option<Subscription>>,
}

impl FavoritesObserver {
    pub fn new(store: Rc<FavoritesStore>) -> Self {
        Self::with_callback(store, |_| {})
    }

    /// 通知で読み直すたびに `on_change` を呼ぶ
    pub fn with_callback(store: Rc<FavoritesStore>, on_change: impl Fn(&FavoritesList) + 'static) -> Self {
        let view = Rc::new(RefCell::new(store.read()));
        let subscription = {
            let reader = Rc::clone(&store);
            let view = Rc::clone(&view);
            store.subscribe(move || {
                let fresh = reader.read();
                *view.borrow_mut() = fresh.clone();
                on_change(&fresh);
            })
        };
        Self {
            store,
            view,
            subscription: RefCell::new(Some(subscription)),
        }
    }

    pub fn list(&self) -> FavoritesList {
        self.view.borrow().clone()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.view.borrow().contains(id)
    }

    pub fn refresh(&self) {
        *self.view.borrow_mut() = self.store.read();
    }

    /// 切り替え後にお気に入りかどうかを返す
    pub fn toggle(&self, entry: &FavoriteEntry) -> Result<bool, StoreError> {
        match self.store.toggle(entry) {
            Ok(list) => {
                let now_favorite = list.contains(&entry.id);
                *self.view.borrow_mut() = list;
                Ok(now_favorite)
            }
            Err(e) => {
                log::error!(target: "favorites", "toggle {} failed: {}", entry.id, e);
                self.refresh();
                Err(e)
            }
        }
    }

    pub fn clear(&self) -> Result<bool, StoreError> {
        let result = self.store.clear();
        self.refresh();
        result
    }

    /// 購読解除（以後の通知では更新されない）
    pub fn detach(&self) {
        self.subscription.borrow_mut().take();
    }
}

// ============================================
// Leptos 用フック
// ============================================

#[derive(Clone, Copy)]
pub struct FavoritesHandle {
    pub list: ReadSignal<FavoritesList>,
    set_list: WriteSignal<FavoritesList>,
    observer: StoredValue<Rc<FavoritesObserver>>,
}

impl FavoritesHandle {
    /// リアクティブなメンバーシップ判定
    pub fn is_favorite(&self, id: &str) -> bool {
        self.list.with(|l| l.contains(id))
    }

    pub fn count(&self) -> usize {
        self.list.with(|l| l.len())
    }

    pub fn toggle(&self, entry: &FavoriteEntry) -> Result<bool, StoreError> {
        // 借用を持ったまま signal を更新しないよう、先に Rc を取り出す
        let observer = self.observer.get_value();
        let result = observer.toggle(entry);
        self.set_list.set(observer.list());
        result
    }

    pub fn clear(&self) -> Result<bool, StoreError> {
        let observer = self.observer.get_value();
        let result = observer.clear();
        self.set_list.set(observer.list());
        result
    }
}

/// 現在のコンポーネントの間だけ購読するお気に入り一覧
pub fn use_favorites() -> FavoritesHandle {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let (list, set_list) = create_signal(FavoritesList::default());

    let observer = Rc::new(FavoritesObserver::with_callback(ctx.favorites.clone(), move |fresh| {
        // アンマウント後に届いた通知は捨てる
        let _ = set_list.try_set(fresh.clone());
    }));
    set_list.set(observer.list());

    let for_cleanup = Rc::clone(&observer);
    on_cleanup(move || for_cleanup.detach());

    FavoritesHandle {
        list,
        set_list,
        observer: store_value(observer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::broadcast::LocalBus;
    use crate::store::storage::MemoryStorage;
    use crate::store::broadcast::Topic;

    fn entry(id: &str) -> FavoriteEntry {
        FavoriteEntry::new(id).unwrap().with_name("Latte").with_price("4.50")
    }

    fn shared_store(bus: &LocalBus) -> Rc<FavoritesStore> {
        Rc::new(FavoritesStore::new(Rc::new(MemoryStorage::new()), Rc::new(bus.clone())))
    }

    #[test]
    fn test_observers_converge_after_toggle() {
        let bus = LocalBus::new();
        let store = shared_store(&bus);
        let favorites_page = FavoritesObserver::new(store.clone());
        let search_page = FavoritesObserver::new(store.clone());

        assert_eq!(search_page.toggle(&entry("17222")), Ok(true));

        assert!(search_page.is_favorite("17222"));
        assert!(favorites_page.is_favorite("17222"));
        assert_eq!(favorites_page.list().len(), 1);

        assert_eq!(favorites_page.toggle(&entry("17222")), Ok(false));
        assert!(!search_page.is_favorite("17222"));
    }

    #[test]
    fn test_observer_seeds_from_storage() {
        let bus = LocalBus::new();
        let store = shared_store(&bus);
        store.toggle(&entry("1")).unwrap();

        let late = FavoritesObserver::new(store);
        assert!(late.is_favorite("1"));
    }

    #[test]
    fn test_callback_receives_fresh_list() {
        let bus = LocalBus::new();
        let store = shared_store(&bus);
        let seen = Rc::new(RefCell::new(0usize));
        let s = seen.clone();
        let _observer = FavoritesObserver::with_callback(store.clone(), move |list| *s.borrow_mut() = list.len());

        store.toggle(&entry("1")).unwrap();
        store.toggle(&entry("2")).unwrap();
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn test_detach_and_drop_unsubscribe() {
        let bus = LocalBus::new();
        let store = shared_store(&bus);
        let detached = FavoritesObserver::new(store.clone());
        let dropped = FavoritesObserver::new(store.clone());
        assert_eq!(bus.listener_count(Topic::Favorites), 2);

        detached.detach();
        drop(dropped);
        assert_eq!(bus.listener_count(Topic::Favorites), 0);

        store.toggle(&entry("9")).unwrap();
        // 購読解除後は古い表示のまま
        assert!(!detached.is_favorite("9"));
        detached.refresh();
        assert!(detached.is_favorite("9"));
    }

    #[test]
    fn test_clear_updates_every_observer() {
        let bus = LocalBus::new();
        let store = shared_store(&bus);
        let a = FavoritesObserver::new(store.clone());
        let b = FavoritesObserver::new(store.clone());
        a.toggle(&entry("1")).unwrap();
        a.toggle(&entry("2")).unwrap();

        assert_eq!(b.clear(), Ok(true));
        assert!(a.list().is_empty());
        assert_eq!(a.clear(), Ok(false));
    }
}
