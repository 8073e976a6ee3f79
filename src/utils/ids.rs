use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of unique identifiers for records and laps. Injected so that tests can produce
/// predictable ids.
pub trait IdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> String;
}

pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Produces `prefix-1`, `prefix-2`, ...
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{next}", self.prefix)
    }
}
