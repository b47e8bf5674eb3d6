//! 入力のデバウンスと重複検索の抑止

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;

/// 世代番号によるデバウンス
///
/// `schedule` のたびに世代が進み、タイマー満了時に最新の世代だけが実行される。
#[derive(Default)]
pub struct Debouncer {
    generation: Cell<u64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい予約を作り、それより前の予約を無効にする
    pub fn schedule(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.get() == ticket
    }

    /// 予約を全て無効にする
    pub fn cancel(&self) {
        self.schedule();
    }

    /// タイマー満了時の処理。予約がまだ最新なら `action` を実行して true
    pub fn fire(&self, ticket: u64, action: impl FnOnce()) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        action();
        true
    }

    /// `delay_ms` の間に次の呼び出しが無ければ `action` を実行
    pub fn run(self: &Rc<Self>, delay_ms: u32, action: impl FnOnce() + 'static) {
        let ticket = self.schedule();
        let this = Rc::clone(self);
        spawn_local(async move {
            gloo::timers::future::TimeoutFuture::new(delay_ms).await;
            this.fire(ticket, action);
        });
    }
}

/// 直前と同じクエリの再検索を防ぐ
#[derive(Default)]
pub struct QueryGate {
    last: RefCell<Option<String>>,
}

impl QueryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいクエリなら true を返して記録する
    pub fn admit(&self, query: &str) -> bool {
        let mut last = self.last.borrow_mut();
        if last.as_deref() == Some(query) {
            return false;
        }
        *last = Some(query.to_string());
        true
    }

    /// 入力が空になった時など。次の同じクエリも検索させる
    pub fn reset(&self) {
        self.last.borrow_mut().take();
    }

    /// 届いたレスポンスがまだ最新のクエリのものか
    pub fn is_latest(&self, query: &str) -> bool {
        self.last.borrow().as_deref() == Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 仮想時間でキー入力とタイマー満了を再現し、実行されたクエリを返す
    fn simulate(keystrokes: &[(u32, &str)], delay_ms: u32) -> Vec<String> {
        let debouncer = Debouncer::new();
        let gate = QueryGate::new();
        let mut tickets = vec![0u64; keystrokes.len()];
        let mut fired = Vec::new();

        // キー入力とタイマー満了を時刻順に並べる（同時刻なら入力が先）
        let mut timeline: Vec<(u32, bool, usize)> = keystrokes
            .iter()
            .enumerate()
            .flat_map(|(i, (at, _))| [(*at, false, i), (*at + delay_ms, true, i)])
            .collect();
        timeline.sort();

        for (_, is_timer, index) in timeline {
            if is_timer {
                let query = keystrokes[index].1;
                debouncer.fire(tickets[index], || {
                    if gate.admit(query) {
                        fired.push(query.to_string());
                    }
                });
            } else {
                tickets[index] = debouncer.schedule();
            }
        }
        fired
    }

    #[test]
    fn test_rapid_typing_issues_one_request() {
        let typed = [(0, "l"), (150, "la"), (300, "lat"), (450, "latte")];
        assert_eq!(simulate(&typed, 220), vec!["latte"]);
    }

    #[test]
    fn test_pause_between_words_issues_two_requests() {
        let typed = [(0, "mo"), (100, "mocha"), (1000, "mochas"), (1100, "mocha")];
        assert_eq!(simulate(&typed, 220), vec!["mocha"]);
        let typed = [(0, "tea"), (500, "teal")];
        assert_eq!(simulate(&typed, 220), vec!["tea", "teal"]);
    }

    #[test]
    fn test_schedule_invalidates_earlier_tickets() {
        let d = Debouncer::new();
        let first = d.schedule();
        let second = d.schedule();
        assert!(!d.is_current(first));
        assert!(d.is_current(second));
        d.cancel();
        assert!(!d.is_current(second));
    }

    #[test]
    fn test_cancel_stops_pending_action() {
        let d = Debouncer::new();
        let ticket = d.schedule();
        d.cancel();
        let mut ran = false;
        assert!(!d.fire(ticket, || ran = true));
        assert!(!ran);

        let ticket = d.schedule();
        assert!(d.fire(ticket, || ran = true));
        assert!(ran);
    }

    #[test]
    fn test_query_gate() {
        let gate = QueryGate::new();
        assert!(gate.admit("latte"));
        assert!(!gate.admit("latte"));
        assert!(gate.is_latest("latte"));
        assert!(gate.admit("mocha"));
        assert!(!gate.is_latest("latte"));
        gate.reset();
        assert!(gate.admit("mocha"));
    }
}
