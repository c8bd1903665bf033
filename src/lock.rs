//! The lock seam.
//!
//! Tables are generic over [`RawLock`], the primitive that guards their
//! chains. [`SysLock`] is the default and wraps the standard mutex; other
//! implementations can inject failures or record how locks are held.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use thiserror::Error;

use crate::sync::Mutex;
use crate::sync::MutexGuard;

/// `EOWNERDEAD` on Linux: the owner of a robust mutex died while holding it.
const EOWNERDEAD: i32 = 130;

// -----------------------------------------------------------------------------
// Raw Lock
// -----------------------------------------------------------------------------

/// A mutual-exclusion primitive with an explicit lifecycle.
///
/// Every lock goes through [`init`], any number of [`acquire`] calls, and
/// finally [`destroy`]. Each step may fail; tables turn those failures into
/// [`Error`] values.
///
/// Releasing happens when the guard returned by [`acquire`] is dropped.
///
/// # Examples
///
/// A lock that counts acquisitions:
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::{Mutex, MutexGuard};
///
/// use locktab::lock::{LockError, RawLock};
/// use locktab::{ConstParams, FineTable};
///
/// static ACQUIRED: AtomicUsize = AtomicUsize::new(0);
///
/// struct Counted(Mutex<()>);
///
/// impl RawLock for Counted {
///   type Guard<'a> = MutexGuard<'a, ()>;
///
///   fn init() -> Result<Self, LockError> {
///     Ok(Self(Mutex::new(())))
///   }
///
///   fn acquire(&self) -> Result<Self::Guard<'_>, LockError> {
///     ACQUIRED.fetch_add(1, Ordering::Relaxed);
///     self.0.lock().map_err(|_| LockError::Poisoned)
///   }
///
///   fn destroy(self) -> Result<(), LockError> {
///     Ok(())
///   }
/// }
///
/// let table: FineTable<'_, ConstParams<8>, Counted> = FineTable::new();
///
/// table.add("a", 1).unwrap();
/// table.add("b", 2).unwrap();
///
/// assert_eq!(ACQUIRED.load(Ordering::Relaxed), 2);
/// ```
///
/// [`init`]: Self::init
/// [`acquire`]: Self::acquire
/// [`destroy`]: Self::destroy
/// [`Error`]: crate::Error
pub trait RawLock: Sized {
  /// Held while the lock is acquired; dropping it releases the lock.
  type Guard<'a>
  where
    Self: 'a;

  /// Creates a new, unlocked lock.
  ///
  /// # Errors
  ///
  /// Returns an error if the underlying primitive cannot be created.
  fn init() -> Result<Self, LockError>;

  /// Blocks until the lock is acquired.
  ///
  /// # Errors
  ///
  /// Returns an error if the lock can no longer be acquired, for example
  /// because a previous holder panicked.
  fn acquire(&self) -> Result<Self::Guard<'_>, LockError>;

  /// Tears the lock down.
  ///
  /// # Errors
  ///
  /// Returns an error if the lock is left in an unusable state.
  fn destroy(self) -> Result<(), LockError>;
}

// -----------------------------------------------------------------------------
// Lock Error
// -----------------------------------------------------------------------------

/// A failure reported by a [`RawLock`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LockError {
  /// A thread panicked while holding the lock.
  #[error("lock poisoned by a panicking holder")]
  Poisoned,
  /// The lock primitive failed with a system error code.
  #[error("lock primitive failed with code {code}")]
  Failed {
    /// The system error code.
    code: i32,
  },
}

impl LockError {
  /// Returns the system error code describing this failure.
  ///
  /// ```
  /// use locktab::lock::LockError;
  ///
  /// assert_eq!(LockError::Failed { code: 11 }.code(), 11);
  /// ```
  #[inline]
  pub const fn code(self) -> i32 {
    match self {
      Self::Poisoned => EOWNERDEAD,
      Self::Failed { code } => code,
    }
  }
}

// -----------------------------------------------------------------------------
// System Lock
// -----------------------------------------------------------------------------

/// The default [`RawLock`], backed by the standard mutex.
///
/// Poisoning is the only failure: a thread that panics while holding the
/// lock makes every later [`acquire`] and the final [`destroy`] fail with
/// [`LockError::Poisoned`].
///
/// [`acquire`]: RawLock::acquire
/// [`destroy`]: RawLock::destroy
pub struct SysLock {
  inner: Mutex<()>,
}

impl RawLock for SysLock {
  type Guard<'a> = MutexGuard<'a, ()>;

  #[inline]
  fn init() -> Result<Self, LockError> {
    Ok(Self {
      inner: Mutex::new(()),
    })
  }

  #[inline]
  fn acquire(&self) -> Result<Self::Guard<'_>, LockError> {
    self.inner.lock().map_err(|_| LockError::Poisoned)
  }

  #[inline]
  fn destroy(self) -> Result<(), LockError> {
    self.inner.into_inner().map_err(|_| LockError::Poisoned)
  }
}

impl Debug for SysLock {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("SysLock").finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
