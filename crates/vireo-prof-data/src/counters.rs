//! Execution counters and process-wide service counters.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::RwLock;

const CHUNK: usize = 256;

/// Per-translation execution counters.
///
/// Counters start at a configured initial value and are decremented by
/// generated code; storage grows in fixed chunks so existing slots never
/// move while the JIT holds pointers to them.
pub struct ProfCounters {
    initial: AtomicI64,
    chunks: RwLock<Vec<Box<[AtomicI64; CHUNK]>>>,
}

impl ProfCounters {
    /// Create counters that initialize each slot to `initial`
    pub fn new(initial: i64) -> Self {
        ProfCounters { initial: AtomicI64::new(initial), chunks: RwLock::new(Vec::new()) }
    }

    fn new_chunk(initial: i64) -> Box<[AtomicI64; CHUNK]> {
        let mut v = Vec::with_capacity(CHUNK);
        v.resize_with(CHUNK, || AtomicI64::new(initial));
        match v.into_boxed_slice().try_into() {
            Ok(chunk) => chunk,
            Err(_) => unreachable!("chunk sized to CHUNK"),
        }
    }

    /// Make sure a slot exists for translation `id`
    pub fn ensure(&self, id: u32) {
        let needed = id as usize / CHUNK + 1;
        let mut chunks = self.chunks.write();
        let initial = self.initial.load(Ordering::Relaxed);
        while chunks.len() < needed {
            chunks.push(Self::new_chunk(initial));
        }
    }

    /// Current value of translation `id`'s counter
    pub fn get(&self, id: u32) -> i64 {
        let chunks = self.chunks.read();
        match chunks.get(id as usize / CHUNK) {
            Some(chunk) => chunk[id as usize % CHUNK].load(Ordering::Relaxed),
            None => self.initial.load(Ordering::Relaxed),
        }
    }

    /// Decrement translation `id`'s counter, returning the new value
    pub fn decrement(&self, id: u32) -> i64 {
        let chunks = self.chunks.read();
        match chunks.get(id as usize / CHUNK) {
            Some(chunk) => chunk[id as usize % CHUNK].fetch_sub(1, Ordering::Relaxed) - 1,
            None => self.initial.load(Ordering::Relaxed),
        }
    }

    /// Reset every allocated counter (and the initial value for future
    /// slots) to `value`
    pub fn reset_all(&self, value: i64) {
        let chunks = self.chunks.write();
        self.initial.store(value, Ordering::Relaxed);
        for chunk in chunks.iter() {
            for c in chunk.iter() {
                c.store(value, Ordering::Relaxed);
            }
        }
    }
}

/// Process-wide service counters exposed by the registry
pub mod service {
    use super::*;

    static OPTIMIZED_FUNCS: AtomicI64 = AtomicI64::new(0);
    static TRIED_DESER: AtomicI64 = AtomicI64::new(0);
    static SUCCEEDED_DESER: AtomicI64 = AtomicI64::new(0);

    static TRIED_DESERIALIZATION: AtomicBool = AtomicBool::new(false);
    static WAS_DESERIALIZED: AtomicBool = AtomicBool::new(false);

    /// Count one function promoted to an optimized translation
    pub fn bump_optimized_funcs() {
        OPTIMIZED_FUNCS.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that profile deserialization was attempted
    pub fn set_tried_deserialization() {
        TRIED_DESERIALIZATION.store(true, Ordering::Relaxed);
        TRIED_DESER.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that profile deserialization succeeded
    pub fn set_deserialized() {
        WAS_DESERIALIZED.store(true, Ordering::Relaxed);
        SUCCEEDED_DESER.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether profile deserialization was attempted
    pub fn tried_deserialization() -> bool {
        TRIED_DESERIALIZATION.load(Ordering::Relaxed)
    }

    /// Whether the profile was deserialized
    pub fn was_deserialized() -> bool {
        WAS_DESERIALIZED.load(Ordering::Relaxed)
    }

    /// Current values of the exported counters, by name
    pub fn snapshot() -> Vec<(&'static str, i64)> {
        vec![
            ("jit.optimized_funcs", OPTIMIZED_FUNCS.load(Ordering::Relaxed)),
            ("jit.tried_deser", TRIED_DESER.load(Ordering::Relaxed)),
            ("jit.succeeded_deser", SUCCEEDED_DESER.load(Ordering::Relaxed)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_initial() {
        let c = ProfCounters::new(1000);
        c.ensure(0);
        assert_eq!(c.get(0), 1000);
    }

    #[test]
    fn test_decrement_and_get() {
        let c = ProfCounters::new(10);
        c.ensure(5);
        assert_eq!(c.decrement(5), 9);
        assert_eq!(c.decrement(5), 8);
        assert_eq!(c.get(5), 8);
    }

    #[test]
    fn test_growth_across_chunks() {
        let c = ProfCounters::new(3);
        c.ensure(CHUNK as u32 * 2 + 7);
        assert_eq!(c.get(CHUNK as u32 * 2 + 7), 3);
        assert_eq!(c.get(0), 3);
    }

    #[test]
    fn test_reset_all_applies_to_existing_and_future_slots() {
        let c = ProfCounters::new(100);
        c.ensure(0);
        c.decrement(0);
        c.reset_all(50);
        assert_eq!(c.get(0), 50);
        c.ensure(CHUNK as u32 + 1);
        assert_eq!(c.get(CHUNK as u32 + 1), 50);
    }

    #[test]
    fn test_service_counter_names() {
        let names: Vec<&str> = service::snapshot().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["jit.optimized_funcs", "jit.tried_deser", "jit.succeeded_deser"]);
    }
}
