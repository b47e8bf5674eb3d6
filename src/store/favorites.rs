//! お気に入りストア
//!
//! 一覧は `favorites_v1` に丸ごと JSON で保存する（部分更新はしない）。
//! 書き込みごとに `favorites_v1_rev` のリビジョンを1つ進め、
//! 古いスナップショットからの書き込みは `StoreError::Conflict` で拒否する。

use std::rc::Rc;

use super::broadcast::{ChangeTransport, Subscription, Topic};
use super::storage::KeyValueStorage;
use super::StoreError;
use crate::models::{FavoriteEntry, FavoritesList};

pub const FAVORITES_KEY: &str = "favorites_v1";
pub const REVISION_KEY: &str = "favorites_v1_rev";

/// 競合時に読み直して再適用する回数
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// ある時点の一覧とリビジョン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub revision: u64,
    pub entries: FavoritesList,
}

pub struct FavoritesStore {
    storage: Rc<dyn KeyValueStorage>,
    broadcast: Rc<dyn ChangeTransport>,
}

impl FavoritesStore {
    pub fn new(storage: Rc<dyn KeyValueStorage>, broadcast: Rc<dyn ChangeTransport>) -> Self {
        Self { storage, broadcast }
    }

    /// 保存済み一覧。無い・壊れている場合は空
    pub fn read(&self) -> FavoritesList {
        let Some(raw) = self.storage.get(FAVORITES_KEY) else {
            return FavoritesList::default();
        };
        let list = FavoritesList::from_json(&raw);
        if list.is_empty() && raw.trim() != "[]" {
            log::debug!(target: "favorites", "ignoring unreadable favorites value ({} bytes)", raw.len());
        }
        list
    }

    pub fn revision(&self) -> u64 {
        self.storage
            .get(REVISION_KEY)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision(),
            entries: self.read(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains(id)
    }

    /// 追加・削除を切り替えて、新しい一覧を返す
    pub fn toggle(&self, entry: &FavoriteEntry) -> Result<FavoritesList, StoreError> {
        let mut last_err = StoreError::Conflict { expected: 0, found: 0 };
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let snapshot = self.snapshot();
            match self.toggle_from(&snapshot, entry) {
                Err(StoreError::Conflict { expected, found }) => {
                    log::warn!(
                        target: "favorites",
                        "favorites changed underneath us (rev {} -> {}), retrying",
                        expected,
                        found
                    );
                    last_err = StoreError::Conflict { expected, found };
                }
                result => return result,
            }
        }
        Err(last_err)
    }

    /// スナップショットを元に切り替える。保存先のリビジョンが進んでいれば失敗する
    pub fn toggle_from(&self, snapshot: &Snapshot, entry: &FavoriteEntry) -> Result<FavoritesList, StoreError> {
        let next = snapshot.entries.toggled(entry);
        self.commit(snapshot.revision, &next)?;
        if next.contains(&entry.id) {
            log::info!(target: "favorites", "added {} ({})", entry.id, entry.display_name());
        } else {
            log::info!(target: "favorites", "removed {}", entry.id);
        }
        self.broadcast.publish(Topic::Favorites);
        Ok(next)
    }

    /// 全件削除。空のときは書き込みも通知もせず `Ok(false)`
    pub fn clear(&self) -> Result<bool, StoreError> {
        let snapshot = self.snapshot();
        if snapshot.entries.is_empty() {
            return Ok(false);
        }
        self.commit(snapshot.revision, &FavoritesList::default())?;
        log::info!(target: "favorites", "cleared {} favorites", snapshot.entries.len());
        self.broadcast.publish(Topic::Favorites);
        Ok(true)
    }

    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> Subscription {
        self.broadcast.subscribe(Topic::Favorites, Rc::new(move |_| on_change()))
    }

    fn commit(&self, expected: u64, list: &FavoritesList) -> Result<(), StoreError> {
        let found = self.revision();
        if found != expected {
            return Err(StoreError::Conflict { expected, found });
        }
        let json = list.to_json().map_err(|e| StoreError::Encode(e.to_string()))?;
        let previous = self.storage.get(FAVORITES_KEY);
        self.storage.set(FAVORITES_KEY, &json)?;
        if let Err(e) = self.storage.set(REVISION_KEY, &(expected + 1).to_string()) {
            // リビジョンが書けなければ一覧も元に戻す
            let restored = match &previous {
                Some(old) => self.storage.set(FAVORITES_KEY, old),
                None => self.storage.remove(FAVORITES_KEY),
            };
            if let Err(restore_err) = restored {
                log::error!(target: "favorites", "failed to roll back favorites: {}", restore_err);
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::broadcast::LocalBus;
    use crate::store::storage::MemoryStorage;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    fn store_with(storage: &MemoryStorage, bus: &LocalBus) -> FavoritesStore {
        FavoritesStore::new(Rc::new(storage.clone()), Rc::new(bus.clone()))
    }

    fn store() -> (FavoritesStore, MemoryStorage, LocalBus) {
        let storage = MemoryStorage::new();
        let bus = LocalBus::new();
        (store_with(&storage, &bus), storage, bus)
    }

    fn entry(id: &str) -> FavoriteEntry {
        FavoriteEntry::new(id)
            .unwrap()
            .with_name(format!("Item {}", id))
            .with_img("https://example.com/img.jpg")
            .with_price("12.99")
    }

    fn ids(list: &FavoritesList) -> Vec<String> {
        list.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_read_empty_storage() {
        let (store, _, _) = store();
        assert!(store.read().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_double_toggle_restores_list() {
        let (store, _, _) = store();
        store.toggle(&entry("1")).unwrap();
        store.toggle(&entry("2")).unwrap();
        let before = store.read();

        for id in ["3", "1", "2"] {
            store.toggle(&entry(id)).unwrap();
            store.toggle(&entry(id)).unwrap();
            let after = store.read();
            assert_eq!(after.ids(), before.ids(), "membership changed after double toggle of {}", id);
        }
    }

    #[test]
    fn test_ids_stay_unique() {
        let (store, _, _) = store();
        let sequence = ["1", "2", "1", "3", "3", "2", "4", "1", "5", "4", "2"];
        for id in sequence {
            let list = store.toggle(&entry(id)).unwrap();
            let unique: HashSet<String> = list.ids();
            assert_eq!(unique.len(), list.len());
        }
        // 奇数回トグルしたものだけが残る
        let expected: HashSet<String> = ["1", "2", "5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(store.read().ids(), expected);
    }

    #[test]
    fn test_new_entry_goes_first() {
        let (store, _, _) = store();
        for id in ["1", "2", "3"] {
            let list = store.toggle(&entry(id)).unwrap();
            assert_eq!(list.entries()[0].id, id);
        }
        assert_eq!(ids(&store.read()), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_ids_compare_as_strings() {
        let (store, storage, _) = store();
        storage.set(FAVORITES_KEY, r#"[{"id":11007,"name":"Margarita","img":"u","price":"14.99"}]"#).unwrap();
        let list = store.toggle(&entry("11007")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_clear_then_read_is_empty() {
        let (store, _, _) = store();
        store.toggle(&entry("1")).unwrap();
        store.toggle(&entry("2")).unwrap();
        assert_eq!(store.clear(), Ok(true));
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_clear_on_empty_list_does_nothing() {
        let (store, storage, bus) = store();
        let notified = Rc::new(Cell::new(0));
        let n = notified.clone();
        let _sub = store_with(&storage, &bus).subscribe(move || n.set(n.get() + 1));

        assert_eq!(store.clear(), Ok(false));
        assert_eq!(notified.get(), 0);
        assert_eq!(storage.get(FAVORITES_KEY), None);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_toggle_is_visible_to_other_subscribers() {
        let storage = MemoryStorage::new();
        let bus = LocalBus::new();
        let writer = store_with(&storage, &bus);
        let reader = Rc::new(store_with(&storage, &bus));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_handler = seen.clone();
        let reader_in_handler = reader.clone();
        let _sub = reader.subscribe(move || {
            *seen_in_handler.borrow_mut() = ids(&reader_in_handler.read());
        });

        writer.toggle(&entry("53049")).unwrap();
        assert_eq!(*seen.borrow(), vec!["53049".to_string()]);
    }

    #[test]
    fn test_corrupt_storage_reads_empty() {
        let (store, storage, _) = store();
        storage.set(FAVORITES_KEY, "{definitely not json").unwrap();
        assert!(store.read().is_empty());

        // 壊れた値の上からでも書き込める
        let list = store.toggle(&entry("1")).unwrap();
        assert_eq!(ids(&list), vec!["1"]);
    }

    #[test]
    fn test_margarita_round_trip() {
        let (store, _, _) = store();
        let margarita = FavoriteEntry::new("53049")
            .unwrap()
            .with_name("Margarita")
            .with_img("url")
            .with_price("14.99");

        store.toggle(&margarita).unwrap();
        let list = store.read();
        assert_eq!(list.len(), 1);
        let saved = &list.entries()[0];
        assert_eq!(saved.id, "53049");
        assert_eq!(saved.name.as_deref(), Some("Margarita"));
        assert_eq!(saved.img.as_deref(), Some("url"));
        assert_eq!(saved.price.as_deref(), Some("14.99"));

        store.toggle(&margarita).unwrap();
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_stale_snapshot_is_rejected() {
        // 2つのタブが同じストレージを共有している状況
        let storage = MemoryStorage::new();
        let tab_a = store_with(&storage, &LocalBus::new());
        let tab_b = store_with(&storage, &LocalBus::new());

        let stale = tab_a.snapshot();
        tab_b.toggle(&entry("x")).unwrap();

        let err = tab_a.toggle_from(&stale, &entry("y")).unwrap_err();
        assert_eq!(err, StoreError::Conflict { expected: 0, found: 1 });
        // 拒否された書き込みは何も消していない
        assert_eq!(ids(&tab_a.read()), vec!["x"]);

        // 通常の toggle は読み直すので、他タブの変更を失わない
        tab_a.toggle(&entry("y")).unwrap();
        assert_eq!(ids(&tab_a.read()), vec!["y", "x"]);
        assert_eq!(tab_a.revision(), 2);
    }

    struct ReadOnlyStorage(MemoryStorage);

    impl KeyValueStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write("QuotaExceededError".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Write("QuotaExceededError".to_string()))
        }
    }

    /// リビジョンだけ書き込めないストレージ
    struct RevisionLockedStorage(MemoryStorage);

    impl KeyValueStorage for RevisionLockedStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == REVISION_KEY {
                return Err(StoreError::Write("QuotaExceededError".to_string()));
            }
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_failed_revision_write_rolls_back_list() {
        let inner = MemoryStorage::new();
        let bus = LocalBus::new();
        let store = FavoritesStore::new(Rc::new(RevisionLockedStorage(inner.clone())), Rc::new(bus.clone()));
        let notified = Rc::new(Cell::new(0));
        let n = notified.clone();
        let _sub = store.subscribe(move || n.set(n.get() + 1));

        // 空からの追加は保存キーごと消えて元通り
        let result = store.toggle(&entry("1"));
        assert!(matches!(result, Err(StoreError::Write(_))));
        assert_eq!(inner.get(FAVORITES_KEY), None);
        assert!(store.read().is_empty());
        assert_eq!(store.revision(), 0);

        // 既存の一覧は書き込み前の JSON に戻る
        let saved = r#"[{"id":"7","name":"Mojito"}]"#;
        inner.set(FAVORITES_KEY, saved).unwrap();
        assert!(store.toggle(&entry("8")).is_err());
        assert_eq!(inner.get(FAVORITES_KEY).as_deref(), Some(saved));
        assert_eq!(ids(&store.read()), vec!["7"]);
        assert!(store.clear().is_err());
        assert_eq!(ids(&store.read()), vec!["7"]);

        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_failed_write_does_not_publish() {
        let bus = LocalBus::new();
        let store = FavoritesStore::new(Rc::new(ReadOnlyStorage(MemoryStorage::new())), Rc::new(bus.clone()));
        let notified = Rc::new(Cell::new(false));
        let n = notified.clone();
        let _sub = store.subscribe(move || n.set(true));

        let result = store.toggle(&entry("1"));
        assert!(matches!(result, Err(StoreError::Write(_))));
        assert!(!notified.get());
        assert!(store.read().is_empty());
    }
}
