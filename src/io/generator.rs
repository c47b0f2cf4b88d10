//! Payload generation for uploads

use bytes::{Bytes, BytesMut};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::PayloadKind;

/// Produces request bodies for PUT and UploadPart calls.
///
/// Each worker owns one generator, so no synchronization is needed. Workers
/// get theirs from [`ObjectGenerator::fork`], which shares the pattern
/// template of a run instead of rebuilding it.
pub struct ObjectGenerator {
    kind: PayloadKind,
    rng: SmallRng,
    /// Shared pattern body; slicing it is a refcount bump
    template: Bytes,
}

impl ObjectGenerator {
    /// Create a generator able to serve chunks of up to `max_len` bytes
    /// without reallocating the pattern.
    pub fn new(kind: PayloadKind, max_len: usize) -> Self {
        let template = match kind {
            PayloadKind::Pattern => Bytes::from(create_test_pattern(max_len)),
            PayloadKind::Random => Bytes::new(),
        };

        Self {
            kind,
            rng: SmallRng::from_entropy(),
            template,
        }
    }

    /// Generator for another worker: same pattern buffer, fresh RNG
    pub fn fork(&self) -> Self {
        Self {
            kind: self.kind,
            rng: SmallRng::from_entropy(),
            template: self.template.clone(),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Body of exactly `len` bytes
    pub fn chunk(&mut self, len: usize) -> Bytes {
        match self.kind {
            PayloadKind::Random => {
                let mut buffer = BytesMut::zeroed(len);
                self.rng.fill(&mut buffer[..]);
                buffer.freeze()
            }
            PayloadKind::Pattern => {
                if len > self.template.len() {
                    self.template = Bytes::from(create_test_pattern(len));
                }
                self.template.slice(..len)
            }
        }
    }
}

/// Repeating 0..=255 byte pattern
fn create_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
