//! Bucket indices.

use core::cmp::Ordering;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result;
use core::hash::Hash;
use core::hash::Hasher;
use core::marker::PhantomData;

use crate::hash;
use crate::params::Params;
use crate::params::ParamsExt;

/// A bucket index that is always less than [`P::LENGTH`].
///
/// Only constructible from a key or a hash, so indexing the bucket array
/// with a `Slot<P>` never needs a bounds check.
///
/// [`P::LENGTH`]: Params::LENGTH
#[repr(transparent)]
pub(crate) struct Slot<P>
where
  P: ?Sized,
{
  value: usize,
  marker: PhantomData<fn(P)>,
}

impl<P> Slot<P>
where
  P: Params + ?Sized,
{
  /// Selects the bucket for `key`.
  #[inline]
  pub(crate) fn of(key: &str) -> Self {
    Self::from_hash(hash::bernstein(key.as_bytes()))
  }

  #[inline]
  pub(crate) const fn from_hash(hash: u32) -> Self {
    Self {
      value: hash as usize & P::MASK,
      marker: PhantomData,
    }
  }

  #[inline]
  pub(crate) const fn get(self) -> usize {
    self.value
  }
}

impl<P> Clone for Slot<P>
where
  P: ?Sized,
{
  #[inline]
  fn clone(&self) -> Self {
    *self
  }
}

impl<P> Copy for Slot<P> where P: ?Sized {}

impl<P> PartialEq for Slot<P>
where
  P: ?Sized,
{
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    self.value == other.value
  }
}

impl<P> Eq for Slot<P> where P: ?Sized {}

impl<P> PartialOrd for Slot<P>
where
  P: ?Sized,
{
  #[inline]
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<P> Ord for Slot<P>
where
  P: ?Sized,
{
  #[inline]
  fn cmp(&self, other: &Self) -> Ordering {
    self.value.cmp(&other.value)
  }
}

impl<P> Hash for Slot<P>
where
  P: ?Sized,
{
  #[inline]
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.value.hash(state);
  }
}

impl<P> Debug for Slot<P>
where
  P: ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(&self.value, f)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
