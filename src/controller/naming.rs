//! Replica name generation.
//!
//! Replica pods (Mode A) are fungible, so their names carry a random
//! suffix to avoid collisions. The generator is injected through the
//! reconciler context rather than read from a process-global source, so
//! tests can seed it and assert exact names.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of the random suffix appended to replica pod names.
const SUFFIX_LEN: usize = 5;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Produces the suffix appended to replica pod names.
pub trait SuffixGenerator: Send + Sync {
    /// Return the next suffix. Successive calls must return fresh values.
    fn suffix(&self) -> String;
}

/// Default generator backed by a seedable RNG.
///
/// The RNG sits behind a mutex so one generator can be shared across
/// concurrent reconciliations of different owners.
pub struct RandomSuffix {
    rng: Mutex<StdRng>,
}

impl RandomSuffix {
    /// Create a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create a generator with a fixed seed, for deterministic tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SuffixGenerator for RandomSuffix {
    fn suffix(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..SUFFIX_LEN)
            .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
            .collect()
    }
}
