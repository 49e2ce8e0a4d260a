//! Verification token generation.

use rand::{distributions::Alphanumeric, Rng};

/// Length of generated verification tokens.
const TOKEN_LEN: usize = 40;

/// Produces the opaque tokens accounts carry while unverified.
///
/// A trait so tests can substitute a deterministic sequence.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates random alphanumeric tokens.
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }
}
