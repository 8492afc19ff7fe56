use bytes::Bytes;
use rand::RngCore;

/// Default token length in bytes.
const DEFAULT_VALUE_LEN: usize = 16;

/// Produces the ownership token written to every node for one lock call.
///
/// Tokens must never repeat: unlock only deletes records whose value matches
/// the token byte for byte, so a reused token could release someone else's
/// lock.
pub trait ValueGenerator: Send + Sync {
    fn generate(&self) -> Bytes;
}

impl<F> ValueGenerator for F
where
    F: Fn() -> Bytes + Send + Sync,
{
    fn generate(&self) -> Bytes {
        self()
    }
}

/// Random tokens from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomValueGenerator {
    len: usize,
}

impl RandomValueGenerator {
    /// Create a generator producing `len` random bytes per token.
    pub fn new(len: usize) -> Self {
        Self { len: len.max(1) }
    }
}

impl Default for RandomValueGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_VALUE_LEN)
    }
}

impl ValueGenerator for RandomValueGenerator {
    fn generate(&self) -> Bytes {
        let mut buf = vec![0u8; self.len];
        rand::rng().fill_bytes(&mut buf);
        Bytes::from(buf)
    }
}
