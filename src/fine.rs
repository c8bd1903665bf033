//! Table guarded by one lock per bucket.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::mem::ManuallyDrop;

use crossbeam_utils::CachePadded;

use crate::array::Array;
use crate::chain::Chain;
use crate::chain::Permit;
use crate::chain::Upsert;
use crate::error::Error;
use crate::error::Site;
use crate::index::Slot;
use crate::lock::LockError;
use crate::lock::RawLock;
use crate::lock::SysLock;
use crate::params::DefaultParams;
use crate::params::Params;
use crate::params::ParamsExt;
use crate::public::Entries;
use crate::public::HashTable;
use crate::public::missing_key;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering::Relaxed;
use crate::utils::log_debug;
use crate::utils::log_error;

// -----------------------------------------------------------------------------
// Bucket
// -----------------------------------------------------------------------------

/// A chain together with the lock that guards it.
///
/// Padded so neighbouring buckets never share a cache line.
struct Bucket<'k, L> {
  lock: L,
  chain: Chain<'k>,
}

// -----------------------------------------------------------------------------
// Fine Table
// -----------------------------------------------------------------------------

/// A fixed-capacity hash table with one lock per bucket.
///
/// [`add`] only acquires the lock of the bucket its key maps to, so writers
/// touching different buckets proceed in parallel. Reads ([`contains`],
/// [`get`], [`lookup`]) take no lock.
///
/// # Type Parameters
///
/// - `'k`: How long the borrowed keys live.
/// - `P`: Bucket count, see [`Params`]. Defaults to [`DefaultParams`].
/// - `L`: The lock primitive, see [`RawLock`]. Defaults to [`SysLock`].
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use locktab::{ConstParams, FineTable};
///
/// let keys: Vec<String> = (0..64).map(|n| format!("k{n}")).collect();
/// let table: FineTable<'_, ConstParams<16>> = FineTable::new();
///
/// thread::scope(|scope| {
///   for chunk in keys.chunks(16) {
///     let table = &table;
///     scope.spawn(move || {
///       for key in chunk {
///         table.add(key, 1).unwrap();
///       }
///     });
///   }
/// });
///
/// assert_eq!(table.len(), 64);
/// assert!(keys.iter().all(|key| table.get(key) == 1));
/// ```
///
/// [`add`]: Self::add
/// [`contains`]: Self::contains
/// [`get`]: Self::get
/// [`lookup`]: Self::lookup
pub struct FineTable<'k, P = DefaultParams, L = SysLock>
where
  P: Params + ?Sized,
  L: RawLock,
{
  entries: CachePadded<AtomicUsize>,
  buckets: ManuallyDrop<Array<CachePadded<Bucket<'k, L>>, P>>,
}

impl<'k, P, L> FineTable<'k, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  /// Creates a new, empty table.
  ///
  /// # Panics
  ///
  /// Panics if any bucket lock cannot be initialized. Use [`try_new`] to
  /// handle the failure instead.
  ///
  /// [`try_new`]: Self::try_new
  #[track_caller]
  #[inline]
  pub fn new() -> Self {
    match Self::try_new() {
      Ok(this) => this,
      Err(error) => panic!("{error}: {}", error.lock_error()),
    }
  }

  /// Creates a new, empty table.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockInit`] if a bucket lock cannot be initialized.
  #[inline]
  pub fn try_new() -> Result<Self, Error> {
    Self::try_new_with(|_| L::init())
  }

  /// Creates a new, empty table, building the lock of bucket `i` with
  /// `make_lock(i)`.
  ///
  /// Locks are built in ascending bucket order.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockInit`] naming the first bucket whose lock could not
  /// be built. The locks of all earlier buckets are destroyed, in ascending
  /// order, and the bucket array is released before returning. A failure
  /// while destroying one of those locks is logged and does not stop the
  /// rollback.
  ///
  /// # Examples
  ///
  /// ```
  /// use locktab::lock::{LockError, RawLock, SysLock};
  /// use locktab::{ConstParams, Error, FineTable, Site};
  ///
  /// let result = FineTable::<'_, ConstParams<8>>::try_new_with(|index| {
  ///   if index == 5 {
  ///     Err(LockError::Failed { code: 12 })
  ///   } else {
  ///     SysLock::init()
  ///   }
  /// });
  ///
  /// assert_eq!(
  ///   result.unwrap_err(),
  ///   Error::LockInit {
  ///     site: Site::Bucket(5),
  ///     source: LockError::Failed { code: 12 },
  ///   },
  /// );
  /// ```
  pub fn try_new_with<F>(mut make_lock: F) -> Result<Self, Error>
  where
    F: FnMut(usize) -> Result<L, LockError>,
  {
    let init = |index: usize| -> Result<CachePadded<Bucket<'k, L>>, Error> {
      match make_lock(index) {
        Ok(lock) => Ok(CachePadded::new(Bucket {
          lock,
          chain: Chain::new(),
        })),
        Err(source) => Err(Error::LockInit {
          site: Site::Bucket(index),
          source,
        }),
      }
    };

    let undo = |index: usize, bucket: CachePadded<Bucket<'k, L>>| {
      let Bucket { lock, chain } = CachePadded::into_inner(bucket);

      drop(chain);

      if let Err(error) = lock.destroy() {
        log_error!("rollback: failed to destroy bucket {index} lock: {error}");
      }
    };

    let buckets: Array<CachePadded<Bucket<'k, L>>, P> =
      Array::try_new(init, undo).map_err(Error::logged)?;

    log_debug!("created fine table with {} buckets", P::LENGTH.as_usize());

    Ok(Self {
      entries: CachePadded::new(AtomicUsize::new(0)),
      buckets: ManuallyDrop::new(buckets),
    })
  }

  /// Returns the number of buckets, which is also the number of locks.
  #[inline]
  pub const fn capacity(&self) -> usize {
    P::LENGTH.as_usize()
  }

  /// Returns the number of distinct keys in the table.
  #[inline]
  pub fn len(&self) -> usize {
    self.entries.load(Relaxed)
  }

  /// Returns `true` if the table contains no entries.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the bucket index `key` maps to.
  ///
  /// Two keys contend in [`add`] exactly when this returns the same index
  /// for both.
  ///
  /// [`add`]: Self::add
  #[inline]
  pub fn bucket_of(&self, key: &str) -> usize {
    Slot::<P>::of(key).get()
  }

  /// Inserts `key` with `value`, or overwrites the value if `key` is
  /// already present.
  ///
  /// Only the lock of the key's bucket is held.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockAcquire`] naming the bucket if its lock cannot be
  /// acquired. The table is left unchanged.
  pub fn add(&self, key: &'k str, value: u32) -> Result<(), Error> {
    let slot: Slot<P> = Slot::of(key);
    let bucket: &Bucket<'k, L> = self.buckets.get(slot);

    let guard: L::Guard<'_> = bucket.lock.acquire().map_err(|source| {
      Error::LockAcquire {
        site: Site::Bucket(slot.get()),
        source,
      }
      .logged()
    })?;

    let permit: Permit<'_> = Permit::new::<L>(&guard);

    if bucket.chain.upsert(key, value, &permit) == Upsert::Inserted {
      self.entries.fetch_add(1, Relaxed);
    }

    drop(guard);

    Ok(())
  }

  /// Returns `true` if `key` is present.
  ///
  /// Takes no lock.
  #[inline]
  pub fn contains(&self, key: &str) -> bool {
    self.buckets.get(Slot::of(key)).chain.find(key).is_some()
  }

  /// Returns the value stored for `key`, or `None` if it is absent.
  ///
  /// Takes no lock.
  #[inline]
  pub fn lookup(&self, key: &str) -> Option<u32> {
    match self.buckets.get(Slot::of(key)).chain.find(key) {
      Some(node) => Some(node.value()),
      None => None,
    }
  }

  /// Returns the value stored for `key`.
  ///
  /// Takes no lock.
  ///
  /// # Panics
  ///
  /// Panics if `key` is not present. Use [`lookup`] when absence is
  /// expected.
  ///
  /// [`lookup`]: Self::lookup
  #[track_caller]
  #[inline]
  pub fn get(&self, key: &str) -> u32 {
    match self.lookup(key) {
      Some(value) => value,
      None => missing_key(key),
    }
  }

  /// Returns an iterator over the published `(key, value)` pairs, in bucket
  /// order.
  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = (&'k str, u32)> + '_ {
    self
      .buckets
      .as_slice()
      .iter()
      .flat_map(|bucket| bucket.chain.iter())
      .map(|node| (node.key(), node.value()))
  }

  /// Frees every entry, tears down every bucket lock, and releases the
  /// bucket array.
  ///
  /// All buckets are visited even after a lock fails to tear down. Dropping
  /// the table does the same but cannot report a lock failure.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockDestroy`] for the lowest bucket whose lock could
  /// not be torn down. All memory is released regardless.
  pub fn destroy(self) -> Result<(), Error> {
    let mut this: ManuallyDrop<Self> = ManuallyDrop::new(self);

    // SAFETY: `this` is never dropped, so `teardown` runs exactly once.
    unsafe { this.teardown() }
  }

  /// Frees the entries and tears down the lock of every bucket, in ascending
  /// order. Every failure is logged; the first one is returned.
  ///
  /// # Safety
  ///
  /// Must be called at most once. Afterwards `buckets` is gone:
  /// the table must not be used, and its fields must not be dropped again.
  unsafe fn teardown(&mut self) -> Result<(), Error> {
    // SAFETY: The caller guarantees `buckets` is not touched again.
    let buckets: Array<CachePadded<Bucket<'k, L>>, P> =
      unsafe { ManuallyDrop::take(&mut self.buckets) };

    let mut result: Result<(), Error> = Ok(());

    buckets.into_each(|index, bucket| {
      let Bucket { lock, chain } = CachePadded::into_inner(bucket);

      drop(chain);

      if let Err(source) = lock.destroy() {
        let error: Error = Error::LockDestroy {
          site: Site::Bucket(index),
          source,
        }
        .logged();

        if result.is_ok() {
          result = Err(error);
        }
      }
    });

    log_debug!("destroyed fine table, freed {} entries", self.entries.load(Relaxed));

    result
  }
}

impl<P, L> Drop for FineTable<'_, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  fn drop(&mut self) {
    // SAFETY: `drop` runs once, and `destroy` never lets it run at all.
    // Failures are logged by `teardown`; there is no caller to report to.
    _ = unsafe { self.teardown() };
  }
}

impl<'k, P, L> HashTable<'k> for FineTable<'k, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  #[inline]
  fn add(&self, key: &'k str, value: u32) -> Result<(), Error> {
    Self::add(self, key, value)
  }

  #[inline]
  fn contains(&self, key: &str) -> bool {
    Self::contains(self, key)
  }

  #[inline]
  fn lookup(&self, key: &str) -> Option<u32> {
    Self::lookup(self, key)
  }

  #[inline]
  fn len(&self) -> usize {
    Self::len(self)
  }

  #[inline]
  fn capacity(&self) -> usize {
    Self::capacity(self)
  }
}

impl<P, L> Debug for FineTable<'_, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("FineTable")
      .field("params", &P::debug())
      .field("len", &self.len())
      .field("entries", &Entries::new(self.iter()))
      .finish()
  }
}

impl<P, L> Default for FineTable<'_, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  #[track_caller]
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
