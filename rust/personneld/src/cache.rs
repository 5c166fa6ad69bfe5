use std::time::{Duration, Instant};

/// Single-value read-through cache that reloads once its entry is older
/// than the configured time-to-live. A zero TTL reloads on every read.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Option<(Instant, T)>,
}

impl<T> TtlCache<T> {
    pub fn invalidate_after(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Changing the TTL also drops the current entry.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
        self.entry = None;
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        match &self.entry {
            Some((loaded_at, _)) => now.saturating_duration_since(*loaded_at) < self.ttl,
            None => false,
        }
    }

    pub fn get_or_try_load<E>(
        &mut self,
        loader: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        self.get_or_try_load_at(Instant::now(), loader)
    }

    /// On loader failure the stale entry is discarded and the error returned;
    /// the next read tries again.
    pub fn get_or_try_load_at<E>(
        &mut self,
        now: Instant,
        loader: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let fresh = self.is_fresh_at(now);
        let entry = match self.entry.take() {
            Some(existing) if fresh => existing,
            _ => (now, loader()?),
        };
        Ok(&self.entry.insert(entry).1)
    }
}
