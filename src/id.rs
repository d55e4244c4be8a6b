//! Node identifier minting.
//!
//! Every generated node id is an IRI of the form `namespace + prefix + suffix`.
//! The suffix comes from an injected [`IdMinter`] strategy:
//!
//! - [`SequentialMinter`]: `0, 1, 2, ...`; deterministic, so insertion order can
//!   be recovered from the numeric suffix after a round trip through storage.
//! - [`RandomSerialMinter`]: 128 random bits as lowercase hex; safe for
//!   independent sessions writing to the same graph.
//!
//! Both produce suffixes made of `[0-9a-f]` only, so the result is a valid IRI
//! whenever the namespace and prefix are.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Strategy for minting unique node identifiers.
///
/// Implementations must never return the same IRI twice over their lifetime.
pub trait IdMinter: Send + Sync + fmt::Debug {
    /// Mint the next id under `namespace`, tagged with a human-readable `prefix`.
    fn next_id(&self, namespace: &str, prefix: &str) -> String;
}

/// Which minting strategy to construct, as selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MintStrategy {
    /// Monotonic integer suffix starting at 0.
    Sequential,
    /// High-entropy random suffix.
    #[default]
    RandomSerial,
}

impl MintStrategy {
    /// Construct a fresh minter for this strategy.
    pub fn build(self) -> Box<dyn IdMinter> {
        match self {
            MintStrategy::Sequential => Box::new(SequentialMinter::new()),
            MintStrategy::RandomSerial => Box::new(RandomSerialMinter),
        }
    }
}

impl fmt::Display for MintStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintStrategy::Sequential => write!(f, "sequential"),
            MintStrategy::RandomSerial => write!(f, "random-serial"),
        }
    }
}

/// Thread-safe sequential minter.
///
/// One counter per instance, shared across namespaces and prefixes, so two
/// calls never yield the same suffix.
#[derive(Debug, Default)]
pub struct SequentialMinter {
    next: AtomicU64,
}

impl SequentialMinter {
    /// Create a minter whose first suffix is `0`.
    pub fn new() -> Self {
        Self::starting_from(0)
    }

    /// Create a minter that resumes from a given suffix.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// The suffix the next call would use, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl IdMinter for SequentialMinter {
    fn next_id(&self, namespace: &str, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{namespace}{prefix}{n}")
    }
}

/// Collision-resistant minter with a random 128-bit suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSerialMinter;

impl IdMinter for RandomSerialMinter {
    fn next_id(&self, namespace: &str, prefix: &str) -> String {
        let serial: u128 = rand::thread_rng().r#gen();
        format!("{namespace}{prefix}{serial:032x}")
    }
}

/// Parse the numeric suffix of a sequentially minted id.
///
/// Returns `None` for ids outside `namespace + prefix` or with a non-numeric tail.
pub fn sequence_number(id: &str, namespace: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(namespace)?.strip_prefix(prefix)?.parse().ok()
}
