//! Errors reported by table operations.

use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use thiserror::Error;

use crate::lock::LockError;
use crate::utils::log_error;

/// A resource failure reported by a table operation.
///
/// Only lock failures are represented here. Allocation failure aborts the
/// process through [`handle_alloc_error`], and looking up an absent key with
/// [`get`] is a caller bug that panics.
///
/// [`handle_alloc_error`]: std::alloc::handle_alloc_error
/// [`get`]: crate::CoarseTable::get
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
  /// A lock could not be initialized while creating the table.
  ///
  /// Every lock initialized before the failing one has been torn down.
  #[error("failed to initialize {site} lock")]
  LockInit {
    /// The lock that failed.
    site: Site,
    /// The lock failure.
    source: LockError,
  },
  /// A lock could not be acquired while adding an entry.
  ///
  /// The table is unchanged.
  #[error("failed to acquire {site} lock")]
  LockAcquire {
    /// The lock that failed.
    site: Site,
    /// The lock failure.
    source: LockError,
  },
  /// A lock could not be torn down while destroying the table.
  #[error("failed to destroy {site} lock")]
  LockDestroy {
    /// The lock that failed.
    site: Site,
    /// The lock failure.
    source: LockError,
  },
}

impl Error {
  /// Returns the lock that failed.
  #[inline]
  pub const fn site(&self) -> Site {
    match self {
      Self::LockInit { site, .. } | Self::LockAcquire { site, .. } | Self::LockDestroy { site, .. } => {
        *site
      }
    }
  }

  /// Returns the underlying lock failure.
  #[inline]
  pub const fn lock_error(&self) -> LockError {
    match self {
      Self::LockInit { source, .. }
      | Self::LockAcquire { source, .. }
      | Self::LockDestroy { source, .. } => *source,
    }
  }

  /// Returns the bucket of the lock that failed, or `None` for the
  /// table-wide lock.
  #[inline]
  pub const fn bucket(&self) -> Option<usize> {
    match self.site() {
      Site::Table => None,
      Site::Bucket(index) => Some(index),
    }
  }

  /// Returns a process exit code for this failure.
  ///
  /// Harnesses that treat every table failure as fatal can pass this to
  /// [`std::process::exit`].
  ///
  /// ```
  /// use locktab::lock::LockError;
  /// use locktab::{Error, Site};
  ///
  /// let error = Error::LockInit {
  ///   site: Site::Bucket(3),
  ///   source: LockError::Failed { code: 12 },
  /// };
  ///
  /// assert_eq!(error.exit_code(), 12);
  /// assert_eq!(error.bucket(), Some(3));
  /// ```
  #[inline]
  pub const fn exit_code(&self) -> i32 {
    self.lock_error().code()
  }

  #[inline]
  pub(crate) fn logged(self) -> Self {
    log_error!("{self}: {}", self.lock_error());
    self
  }
}

/// Identifies the lock involved in an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Site {
  /// The single lock of a [`CoarseTable`].
  ///
  /// [`CoarseTable`]: crate::CoarseTable
  Table,
  /// The lock of one bucket of a [`FineTable`].
  ///
  /// [`FineTable`]: crate::FineTable
  Bucket(usize),
}

impl Display for Site {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Table => f.write_str("table-wide"),
      Self::Bucket(index) => write!(f, "bucket {index}"),
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
