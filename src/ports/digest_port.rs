//! Optional per-symbol narrative digest.

/// Supplies an opaque text digest for a high-scoring symbol. Failures are
/// the implementation's concern; an empty string means "no digest".
pub trait DigestPort {
    fn digest(&self, symbol: &str) -> String;
}
