//! Random key/value payloads for write operations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One key/value pair to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub key: String,
    pub value: String,
}

/// Generates random alphabetic keys and values of fixed lengths.
///
/// # Example
/// ```
/// use rate_bench::PayloadGenerator;
/// use rand::SeedableRng;
///
/// let generator = PayloadGenerator::new(5, 10);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let payload = generator.generate(&mut rng);
/// assert_eq!(payload.key.len(), 5);
/// assert_eq!(payload.value.len(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadGenerator {
    key_length: usize,
    value_length: usize,
}

impl PayloadGenerator {
    /// Create a generator for keys of `key_length` and values of `value_length` letters.
    pub fn new(key_length: usize, value_length: usize) -> Self {
        Self {
            key_length,
            value_length,
        }
    }

    /// Generate a payload from the given RNG.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Payload {
        Payload {
            key: random_string(rng, self.key_length),
            value: random_string(rng, self.value_length),
        }
    }

    /// Generate a payload from a fresh RNG seeded for one worker.
    pub fn generate_seeded(&self, seed: u64) -> Payload {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate(&mut rng)
    }
}

impl Default for PayloadGenerator {
    fn default() -> Self {
        Self::new(5, 10)
    }
}

/// Random string of `len` ASCII letters.
pub fn random_string<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
        .collect()
}
