//! Request id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use reqcycle_protocol::RequestId;

use crate::config::IdStrategy;

pub(crate) enum IdGenerator {
    Uuid,
    Sequential { salt: u32, counter: AtomicU64 },
}

impl IdGenerator {
    pub(crate) fn new(strategy: IdStrategy) -> Self {
        match strategy {
            IdStrategy::Uuid => Self::Uuid,
            IdStrategy::Sequential => Self::Sequential {
                salt: rand::random(),
                counter: AtomicU64::new(0),
            },
        }
    }

    pub(crate) fn next_id(&self) -> RequestId {
        match self {
            Self::Uuid => RequestId::from(uuid::Uuid::new_v4().to_string()),
            Self::Sequential { salt, counter } => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                RequestId::from(format!("{salt:08x}-{n:016x}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequential_ids_share_salt_and_count_up() {
        let ids = IdGenerator::new(IdStrategy::Sequential);
        let a = ids.next_id();
        let b = ids.next_id();
        let (salt_a, n_a) = a.as_str().split_once('-').unwrap();
        let (salt_b, n_b) = b.as_str().split_once('-').unwrap();
        assert_eq!(salt_a, salt_b);
        assert_eq!(n_a, "0000000000000000");
        assert_eq!(n_b, "0000000000000001");
    }

    #[test]
    fn uuid_ids_are_distinct() {
        let ids = IdGenerator::new(IdStrategy::Uuid);
        let seen: HashSet<_> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }
}
