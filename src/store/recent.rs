//! 最近の検索（`recent_searches_v1`）

use std::collections::HashSet;
use std::rc::Rc;

use super::broadcast::{ChangeTransport, Subscription, Topic};
use super::storage::KeyValueStorage;
use super::StoreError;

pub const RECENT_SEARCHES_KEY: &str = "recent_searches_v1";

pub struct RecentSearches {
    storage: Rc<dyn KeyValueStorage>,
    broadcast: Rc<dyn ChangeTransport>,
    limit: usize,
}

impl RecentSearches {
    pub fn new(storage: Rc<dyn KeyValueStorage>, broadcast: Rc<dyn ChangeTransport>, limit: usize) -> Self {
        Self { storage, broadcast, limit }
    }

    /// 新しい順。壊れたデータは空扱い
    pub fn read(&self) -> Vec<String> {
        self.storage
            .get(RECENT_SEARCHES_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|items| items.into_iter().filter(|s| !s.trim().is_empty()).take(self.limit).collect())
            .unwrap_or_default()
    }

    /// クエリを先頭に記録する（重複は前に移動、上限を超えた分は捨てる）
    pub fn record(&self, query: &str) -> Result<Vec<String>, StoreError> {
        let query = query.trim();
        let current = self.read();
        if query.is_empty() {
            return Ok(current);
        }
        let mut updated = Vec::with_capacity(self.limit);
        updated.push(query.to_string());
        updated.extend(current.into_iter().filter(|r| r != query));
        updated.truncate(self.limit);

        let json = serde_json::to_string(&updated).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.storage.set(RECENT_SEARCHES_KEY, &json)?;
        log::debug!(target: "search", "recorded recent search {:?}", query);
        self.broadcast.publish(Topic::RecentSearches);
        Ok(updated)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        if self.storage.get(RECENT_SEARCHES_KEY).is_none() {
            return Ok(());
        }
        self.storage.remove(RECENT_SEARCHES_KEY)?;
        self.broadcast.publish(Topic::RecentSearches);
        Ok(())
    }

    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> Subscription {
        self.broadcast.subscribe(Topic::RecentSearches, Rc::new(move |_| on_change()))
    }
}

/// 入力候補: 最近の検索 → 検索結果の名前の順に、重複なしで `limit` 件まで
pub fn suggestions<'a>(
    recent: &'a [String],
    result_names: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    recent
        .iter()
        .map(String::as_str)
        .chain(result_names.into_iter().take(limit))
        .filter(|s| !s.trim().is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .take(limit)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::broadcast::LocalBus;
    use crate::store::storage::MemoryStorage;
    use std::cell::Cell;

    fn recent(storage: &MemoryStorage, bus: &LocalBus) -> RecentSearches {
        RecentSearches::new(Rc::new(storage.clone()), Rc::new(bus.clone()), 8)
    }

    #[test]
    fn test_record_moves_duplicates_to_front() {
        let r = recent(&MemoryStorage::new(), &LocalBus::new());
        r.record("latte").unwrap();
        r.record("mocha").unwrap();
        let list = r.record(" latte ").unwrap();
        assert_eq!(list, vec!["latte", "mocha"]);
        assert_eq!(r.read(), list);
    }

    #[test]
    fn test_record_caps_at_limit() {
        let r = recent(&MemoryStorage::new(), &LocalBus::new());
        for i in 0..12 {
            r.record(&format!("query {}", i)).unwrap();
        }
        let list = r.read();
        assert_eq!(list.len(), 8);
        assert_eq!(list[0], "query 11");
        assert_eq!(list[7], "query 4");
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let bus = LocalBus::new();
        let r = recent(&MemoryStorage::new(), &bus);
        let published = Rc::new(Cell::new(0));
        let p = published.clone();
        let _sub = r.subscribe(move || p.set(p.get() + 1));

        assert!(r.record("   ").unwrap().is_empty());
        assert_eq!(published.get(), 0);

        r.record("brownie").unwrap();
        assert_eq!(published.get(), 1);
    }

    #[test]
    fn test_corrupt_value_reads_empty() {
        let storage = MemoryStorage::new();
        storage.set(RECENT_SEARCHES_KEY, "[1, 2").unwrap();
        assert!(recent(&storage, &LocalBus::new()).read().is_empty());
    }

    #[test]
    fn test_clear_removes_key() {
        let storage = MemoryStorage::new();
        let r = recent(&storage, &LocalBus::new());
        r.record("tea").unwrap();
        r.clear().unwrap();
        assert!(r.read().is_empty());
        assert_eq!(storage.get(RECENT_SEARCHES_KEY), None);
    }

    #[test]
    fn test_suggestions_merge_recent_and_results() {
        let recent = vec!["latte".to_string(), "Mojito".to_string()];
        let names = ["Mojito", "Mojito #3", "Mojito Extra", "Mocha", "Margarita", "Martini", "Manhattan"];
        let s = suggestions(&recent, names, 6);
        assert_eq!(s, vec!["latte", "Mojito", "Mojito #3", "Mojito Extra", "Mocha", "Margarita"]);
    }

    #[test]
    fn test_suggestions_skip_blank_names() {
        let s = suggestions(&[], ["", "Espresso", " "], 6);
        assert_eq!(s, vec!["Espresso"]);
    }
}
