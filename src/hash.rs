//! Bucket selection.
//!
//! Keys are hashed with Bernstein's `djb2` function and reduced to a bucket
//! index. The hash is fixed: every table variant maps a key to the same
//! bucket for its whole lifetime.

use core::hash::BuildHasher;
use core::hash::Hasher;

use crate::index::Slot;
use crate::params::Params;

/// Initial state of the Bernstein hash.
pub const SEED: u32 = 5381;

/// Hashes `bytes` with Bernstein's `djb2` function.
///
/// Computes `h = h * 33 + byte` over the input, starting from [`SEED`], with
/// wrapping 32-bit arithmetic. Not collision resistant.
///
/// ```
/// use locktab::hash::{SEED, bernstein};
///
/// assert_eq!(bernstein(b""), SEED);
/// assert_eq!(bernstein(b"a"), SEED * 33 + u32::from(b'a'));
/// ```
#[inline]
pub fn bernstein(bytes: &[u8]) -> u32 {
  bytes.iter().fold(SEED, |hash, &byte| step(hash, byte))
}

/// Returns the bucket index of `key` in a table configured with `P`.
///
/// The result always lies in `0..P::LENGTH`.
///
/// ```
/// use locktab::ConstParams;
/// use locktab::hash::bucket_index;
///
/// assert!(bucket_index::<ConstParams<4>>("a") < 4);
/// ```
#[inline]
pub fn bucket_index<P>(key: &str) -> usize
where
  P: Params + ?Sized,
{
  Slot::<P>::of(key).get()
}

#[inline]
fn step(hash: u32, byte: u8) -> u32 {
  (hash << 5).wrapping_add(hash).wrapping_add(u32::from(byte))
}

// -----------------------------------------------------------------------------
// Hasher
// -----------------------------------------------------------------------------

/// A [`Hasher`] running the same function as [`bernstein`].
///
/// Writing raw bytes produces the same state as [`bernstein`]; note that the
/// [`Hash`] impl for `str` appends a terminator byte, so hashing a `&str`
/// through [`Hash`] does not match `bernstein(key.as_bytes())`.
///
/// [`Hash`]: core::hash::Hash
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bernstein {
  state: u32,
}

impl Bernstein {
  /// Creates a hasher in the [`SEED`] state.
  #[inline]
  pub const fn new() -> Self {
    Self { state: SEED }
  }
}

impl Default for Bernstein {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Hasher for Bernstein {
  #[inline]
  fn finish(&self) -> u64 {
    u64::from(self.state)
  }

  #[inline]
  fn write(&mut self, bytes: &[u8]) {
    self.state = bytes.iter().fold(self.state, |hash, &byte| step(hash, byte));
  }
}

/// A [`BuildHasher`] producing [`Bernstein`] hashers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct BuildBernstein;

impl BuildHasher for BuildBernstein {
  type Hasher = Bernstein;

  #[inline]
  fn build_hasher(&self) -> Self::Hasher {
    Bernstein::new()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
