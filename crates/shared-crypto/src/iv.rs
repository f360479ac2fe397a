//! IV generation with reuse detection (spec section 4.1: "the process must
//! abort rather than ever reuse an IV under the same key").

use parking_lot::Mutex;
use rand::RngCore;
use std::collections::HashSet;

/// Generates random 96-bit IVs for AES-GCM and aborts the process if it
/// ever detects one it has already issued. A single `IvGenerator` is meant
/// to be scoped to one key's lifetime: its cache is what makes reuse
/// detection possible, so the generator must not be shared across keys.
pub struct IvGenerator {
    issued: Mutex<HashSet<[u8; 12]>>,
}

impl IvGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self { issued: Mutex::new(HashSet::new()) }
    }

    /// Produce a fresh 12-byte IV, guaranteed distinct from every IV this
    /// generator has issued before. Aborts the process on collision: with
    /// a 96-bit space this should never happen outside a broken RNG, and
    /// silently tolerating it would violate AES-GCM's security contract.
    #[must_use]
    pub fn next_iv(&self) -> [u8; 12] {
        let mut rng = rand::thread_rng();
        let mut guard = self.issued.lock();
        for _ in 0..8 {
            let mut iv = [0u8; 12];
            rng.fill_bytes(&mut iv);
            if guard.insert(iv) {
                return iv;
            }
        }
        eprintln!("fatal: IV reuse detected after repeated collisions, aborting process");
        std::process::abort();
    }
}

impl Default for IvGenerator {
    fn default() -> Self {
        Self::new()
    }
}
