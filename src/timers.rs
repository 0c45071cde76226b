use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Virtual `setTimeout` queue driven by host-supplied time.
///
/// Timers with equal deadlines fire in scheduling order.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    pending: BTreeMap<(u64, TimerId), K>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((now_ms.saturating_add(delay_ms), id), kind);
        id
    }

    /// Clearing an unknown or already fired timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.pending.keys().find(|(_, t)| *t == id).copied();
        key.and_then(|k| self.pending.remove(&k)).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.keys().any(|(_, t)| *t == id)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, u64, K)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > now_ms {
            return None;
        }
        let kind = self.pending.remove(&(deadline, id))?;
        Some((id, deadline, kind))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Trailing-edge debounce: the value applies once `wait_ms` pass without a
/// newer call.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    wait_ms: u64,
    pending: Option<(u64, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(wait_ms: u64) -> Self {
        Self {
            wait_ms,
            pending: None,
        }
    }

    pub fn call(&mut self, now_ms: u64, value: T) {
        self.pending = Some((now_ms.saturating_add(self.wait_ms), value));
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<T> {
        match &self.pending {
            Some((due, _)) if *due <= now_ms => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
