//! The interface shared by both tables.

use core::cell::Cell;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use crate::error::Error;

/// Operations shared by [`CoarseTable`] and [`FineTable`].
///
/// Lets callers and harnesses run the same workload against either locking
/// strategy.
///
/// # Examples
///
/// ```
/// use locktab::{CoarseTable, ConstParams, FineTable, HashTable};
///
/// fn fill<'k>(table: &impl HashTable<'k>, keys: &'k [String]) {
///   for (value, key) in (0..).zip(keys) {
///     table.add(key, value).unwrap();
///   }
/// }
///
/// let keys: Vec<String> = (0..10).map(|n| format!("key-{n}")).collect();
///
/// let coarse: CoarseTable<'_, ConstParams<4>> = CoarseTable::new();
/// let fine: FineTable<'_, ConstParams<4>> = FineTable::new();
///
/// fill(&coarse, &keys);
/// fill(&fine, &keys);
///
/// assert_eq!(coarse.get("key-7"), fine.get("key-7"));
/// ```
///
/// [`CoarseTable`]: crate::CoarseTable
/// [`FineTable`]: crate::FineTable
pub trait HashTable<'k> {
  /// Inserts `key` with `value`, or overwrites the value of an existing key.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockAcquire`] if the guarding lock cannot be acquired.
  fn add(&self, key: &'k str, value: u32) -> Result<(), Error>;

  /// Returns `true` if `key` is present.
  fn contains(&self, key: &str) -> bool;

  /// Returns the value stored for `key`, or `None` if it is absent.
  fn lookup(&self, key: &str) -> Option<u32>;

  /// Returns the value stored for `key`.
  ///
  /// # Panics
  ///
  /// Panics if `key` is not present.
  #[track_caller]
  #[inline]
  fn get(&self, key: &str) -> u32 {
    match self.lookup(key) {
      Some(value) => value,
      None => missing_key(key),
    }
  }

  /// Returns the number of distinct keys.
  fn len(&self) -> usize;

  /// Returns `true` if the table holds no entries.
  #[inline]
  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the number of buckets.
  fn capacity(&self) -> usize;
}

#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn missing_key(key: &str) -> ! {
  panic!("key not found: {key:?}");
}

/// Formats an entry iterator as a map without collecting it.
pub(crate) struct Entries<I> {
  inner: Cell<Option<I>>,
}

impl<I> Entries<I> {
  #[inline]
  pub(crate) const fn new(iter: I) -> Self {
    Self {
      inner: Cell::new(Some(iter)),
    }
  }
}

impl<'k, I> Debug for Entries<I>
where
  I: Iterator<Item = (&'k str, u32)>,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self.inner.take() {
      Some(iter) => f.debug_map().entries(iter).finish(),
      None => f.write_str("{..}"),
    }
  }
}
