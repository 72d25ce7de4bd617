//! Synthetic handle generation for the identity probe.

use rand::Rng;
use std::collections::HashSet;
use std::sync::Mutex;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Produces short random lowercase handles, unique for the lifetime
/// of the generator instance.
#[derive(Debug, Default)]
pub struct HandleGenerator {
    seen: Mutex<HashSet<String>>,
}

impl HandleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        loop {
            let candidate = {
                let mut rng = rand::thread_rng();
                let len = rng.gen_range(3..6);
                (0..len)
                    .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
                    .collect::<String>()
            };

            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            if seen.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
