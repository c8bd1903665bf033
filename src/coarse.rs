//! Table guarded by a single lock.

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

/// A fixed-capacity hash table whose mutations are serialized by one
/// table-wide lock.
///
/// Every [`add`] acquires the same lock, even when two calls target
/// different buckets. Reads ([`contains`], [`get`], [`lookup`]) take no lock.
///
/// The lock belongs to the table instance: independent tables never contend
/// with each other.
///
/// # Type Parameters
///
/// - `'k`: How long the borrowed keys live. Keys are stored by reference and
///   never copied, so the table cannot outlive them.
/// - `P`: Bucket count, see [`Params`]. Defaults to [`DefaultParams`].
/// - `L`: The lock primitive, see [`RawLock`]. Defaults to [`SysLock`].
///
/// # Examples
///
/// ```
/// use locktab::{CoarseTable, ConstParams};
///
/// let table: CoarseTable<'_, ConstParams<4>> = CoarseTable::new();
///
/// table.add("a", 1).unwrap();
/// table.add("b", 2).unwrap();
/// table.add("a", 4).unwrap();
///
/// assert!(table.contains("a"));
/// assert_eq!(table.get("a"), 4);
/// assert_eq!(table.len(), 2);
/// ```
///
/// [`add`]: Self::add
/// [`contains`]: Self::contains
/// [`get`]: Self::get
/// [`lookup`]: Self::lookup
pub struct CoarseTable<'k, P = DefaultParams, L = SysLock>
where
  P: Params + ?Sized,
  L: RawLock,
{
  lock: ManuallyDrop<CachePadded<L>>,
  entries: CachePadded<AtomicUsize>,
  buckets: ManuallyDrop<Array<Chain<'k>, P>>,
}

impl<'k, P, L> CoarseTable<'k, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  /// Creates a new, empty table.
  ///
  /// # Panics
  ///
  /// Panics if the table-wide lock cannot be initialized. Use [`try_new`]
  /// to handle the failure instead.
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
  /// Returns [`Error::LockInit`] if the table-wide lock cannot be
  /// initialized.
  #[inline]
  pub fn try_new() -> Result<Self, Error> {
    Self::try_new_with(|_| L::init())
  }

  /// Creates a new, empty table, building its lock with `make_lock`.
  ///
  /// `make_lock` is called once, with ordinal `0`.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockInit`] if `make_lock` fails. The bucket array is
  /// released before returning.
  pub fn try_new_with<F>(mut make_lock: F) -> Result<Self, Error>
  where
    F: FnMut(usize) -> Result<L, LockError>,
  {
    let buckets: Array<Chain<'k>, P> = Array::new(|_| Chain::new());

    let lock: L = make_lock(0).map_err(|source| {
      Error::LockInit {
        site: Site::Table,
        source,
      }
      .logged()
    })?;

    log_debug!("created coarse table with {} buckets", P::LENGTH.as_usize());

    Ok(Self {
      lock: ManuallyDrop::new(CachePadded::new(lock)),
      entries: CachePadded::new(AtomicUsize::new(0)),
      buckets: ManuallyDrop::new(buckets),
    })
  }

  /// Returns the number of buckets.
  #[inline]
  pub const fn capacity(&self) -> usize {
    P::LENGTH.as_usize()
  }

  /// Returns the number of distinct keys in the table.
  ///
  /// Updates of an existing key do not change the count.
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
  #[inline]
  pub fn bucket_of(&self, key: &str) -> usize {
    Slot::<P>::of(key).get()
  }

  /// Inserts `key` with `value`, or overwrites the value if `key` is
  /// already present.
  ///
  /// The key is stored by reference, not copied.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockAcquire`] if the table-wide lock cannot be
  /// acquired. The table is left unchanged.
  pub fn add(&self, key: &'k str, value: u32) -> Result<(), Error> {
    let guard: L::Guard<'_> = self.lock.acquire().map_err(|source| {
      Error::LockAcquire {
        site: Site::Table,
        source,
      }
      .logged()
    })?;

    let permit: Permit<'_> = Permit::new::<L>(&guard);
    let chain: &Chain<'k> = self.buckets.get(Slot::of(key));

    if chain.upsert(key, value, &permit) == Upsert::Inserted {
      self.entries.fetch_add(1, Relaxed);
    }

    drop(guard);

    Ok(())
  }

  /// Returns `true` if `key` is present.
  ///
  /// Takes no lock; an `add` running concurrently may not be visible yet.
  #[inline]
  pub fn contains(&self, key: &str) -> bool {
    self.buckets.get(Slot::of(key)).find(key).is_some()
  }

  /// Returns the value stored for `key`, or `None` if it is absent.
  ///
  /// Takes no lock; an `add` running concurrently may not be visible yet.
  #[inline]
  pub fn lookup(&self, key: &str) -> Option<u32> {
    match self.buckets.get(Slot::of(key)).find(key) {
      Some(node) => Some(node.value()),
      None => None,
    }
  }

  /// Returns the value stored for `key`.
  ///
  /// Takes no lock; an `add` running concurrently may not be visible yet.
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
  ///
  /// Takes no lock.
  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = (&'k str, u32)> + '_ {
    self
      .buckets
      .as_slice()
      .iter()
      .flat_map(|chain| chain.iter())
      .map(|node| (node.key(), node.value()))
  }

  /// Frees every entry, tears down the table-wide lock, and releases the
  /// bucket array.
  ///
  /// Dropping the table does the same but cannot report a lock failure.
  ///
  /// # Errors
  ///
  /// Returns [`Error::LockDestroy`] if the lock cannot be torn down. All
  /// memory is released regardless.
  pub fn destroy(self) -> Result<(), Error> {
    let mut this: ManuallyDrop<Self> = ManuallyDrop::new(self);

    // SAFETY: `this` is never dropped, so `teardown` runs exactly once.
    unsafe { this.teardown() }.map_err(Error::logged)
  }

  /// Frees every entry, then tears down the lock.
  ///
  /// # Safety
  ///
  /// Must be called at most once. Afterwards `lock` and `buckets` are gone:
  /// the table must not be used, and its fields must not be dropped again.
  unsafe fn teardown(&mut self) -> Result<(), Error> {
    // SAFETY: The caller guarantees neither field is touched again.
    let buckets: Array<Chain<'k>, P> = unsafe { ManuallyDrop::take(&mut self.buckets) };
    // SAFETY: As above.
    let lock: CachePadded<L> = unsafe { ManuallyDrop::take(&mut self.lock) };

    drop(buckets);

    log_debug!("destroyed coarse table, freed {} entries", self.entries.load(Relaxed));

    CachePadded::into_inner(lock).destroy().map_err(|source| Error::LockDestroy {
      site: Site::Table,
      source,
    })
  }
}

impl<P, L> Drop for CoarseTable<'_, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  fn drop(&mut self) {
    // SAFETY: `drop` runs once, and `destroy` never lets it run at all.
    if let Err(error) = unsafe { self.teardown() } {
      log_error!("{error} while dropping table: {}", error.lock_error());
    }
  }
}

impl<'k, P, L> HashTable<'k> for CoarseTable<'k, P, L>
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

impl<P, L> Debug for CoarseTable<'_, P, L>
where
  P: Params + ?Sized,
  L: RawLock,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("CoarseTable")
      .field("params", &P::debug())
      .field("len", &self.len())
      .field("entries", &Entries::new(self.iter()))
      .finish()
  }
}

impl<P, L> Default for CoarseTable<'_, P, L>
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
