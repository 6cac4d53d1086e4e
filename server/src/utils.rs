//! Timestamps and entity id generation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Source of fresh entity ids. Every returned id must be unique for the
/// lifetime of the generator.
pub trait IdGenerator: Send {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Production ids: `<prefix>_<millis>_<random hex>`, plus a counter so two ids
/// minted in the same millisecond with the same random suffix still differ.
pub struct RandomIds {
    rng: StdRng,
    counter: u64,
}

impl RandomIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            counter: 0,
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!(
            "{}_{}_{:08x}{}",
            prefix,
            get_timestamp(),
            self.rng.gen::<u32>(),
            self.counter
        )
    }
}

/// Deterministic ids `<prefix>_1`, `<prefix>_2`, ... with one counter per generator
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let id = self.next.max(1);
        self.next = id + 1;
        format!("{}_{}", prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let first = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        assert!(get_timestamp() > first);
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id("p"), "p_1");
        assert_eq!(ids.next_id("c"), "c_2");
        assert_eq!(ids.next_id("p"), "p_3");
    }

    #[test]
    fn test_sequential_ids_default_starts_at_one() {
        let mut ids = SequentialIds::default();
        assert_eq!(ids.next_id("p"), "p_1");
    }

    #[test]
    fn test_random_ids_are_unique_and_prefixed() {
        let mut ids = RandomIds::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.next_id("c")).collect();

        assert_eq!(generated.len(), 1000);
        assert!(generated.iter().all(|id| id.starts_with("c_")));
    }
}
