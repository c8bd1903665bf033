//! Fixed-capacity, string-keyed concurrent hash tables.
//!
//! `locktab` provides two tables with the same interface and different
//! locking strategies:
//!
//! - [`CoarseTable`] serializes every mutation behind one table-wide lock.
//! - [`FineTable`] gives each bucket its own lock, so writers only contend
//!   when their keys land in the same bucket.
//!
//! Both map borrowed `&str` keys to `u32` values, select buckets with the
//! Bernstein (djb2) hash, and resolve collisions by chaining.
//!
//! # Usage
//!
//! ```
//! use locktab::{ConstParams, FineTable};
//!
//! let table: FineTable<'_, ConstParams<4>> = FineTable::new();
//!
//! table.add("a", 1).unwrap();
//! table.add("b", 2).unwrap();
//! table.add("c", 3).unwrap();
//! table.add("a", 4).unwrap();
//!
//! assert!(table.contains("a"));
//! assert!(!table.contains("d"));
//! assert_eq!(table.get("a"), 4);
//! assert_eq!(table.len(), 3);
//!
//! table.destroy().unwrap();
//! ```
//!
//! # Keys
//!
//! Keys are stored by reference, never copied. The table borrows every key
//! it holds for its lifetime parameter `'k`, so the borrow checker rejects
//! any program that frees a key while the table is still alive:
//!
//! ```compile_fail
//! use locktab::CoarseTable;
//!
//! let table: CoarseTable<'_> = CoarseTable::new();
//!
//! {
//!   let key = String::from("short-lived");
//!   table.add(&key, 1).unwrap();
//! }
//!
//! table.contains("short-lived");
//! ```
//!
//! # Configuration
//!
//! The bucket count is fixed at compile time through the [`Params`] trait.
//! [`DefaultParams`] provides [`Capacity::DEF`] buckets; [`ConstParams`]
//! picks any other count:
//!
//! ```
//! use locktab::{CoarseTable, ConstParams};
//!
//! let table: CoarseTable<'_, ConstParams<100>> = CoarseTable::new();
//! assert_eq!(table.capacity(), 128);
//! ```
//!
//! Capacity is rounded up to the nearest power of two and clamped to
//! <code>[Capacity::MIN]..=[Capacity::MAX]</code>. Tables never resize:
//! chains simply grow as more keys share a bucket.
//!
//! # Concurrency
//!
//! [`add`] is safe to call from any number of threads. Lookups take no lock
//! at all: a lookup racing with an `add` to the same bucket sees either the
//! old state or the new one, never a torn value or freed memory.
//!
//! # Errors
//!
//! Lock failures surface as [`Error`] values naming the lock involved.
//! Allocation failure aborts the process, and [`get`] panics when the key is
//! absent; use [`lookup`] to test for absence instead.
//!
//! # Logging
//!
//! With the `logging` feature enabled, table creation, teardown, and every
//! lock failure are reported through the [`log`] facade.
//!
//! [Capacity::MAX]: crate::config::Capacity::MAX
//! [Capacity::MIN]: crate::config::Capacity::MIN
//! [`Capacity::DEF`]: crate::config::Capacity::DEF
//! [`ConstParams`]: crate::config::ConstParams
//! [`DefaultParams`]: crate::config::DefaultParams
//! [`Params`]: crate::config::Params
//! [`add`]: crate::FineTable::add
//! [`get`]: crate::FineTable::get
//! [`lookup`]: crate::FineTable::lookup
//! [`log`]: https://docs.rs/log
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod array;
mod chain;
mod coarse;
mod error;
mod fine;
mod index;
mod params;
mod public;
mod utils;

pub mod hash;
pub mod lock;

pub(crate) use crate::utils::alloc;
pub(crate) use crate::utils::sync;

pub mod config {
  //! Configuration parameters which can be used to override the default table
  //! settings.

  pub use crate::params::Capacity;
  pub use crate::params::ConstParams;
  pub use crate::params::DebugParams;
  pub use crate::params::DefaultParams;
  pub use crate::params::Params;
  pub use crate::params::ParamsExt;
}

#[doc(inline)]
pub use self::config::Capacity;

#[doc(inline)]
pub use self::config::ConstParams;

#[doc(inline)]
pub use self::config::DefaultParams;

#[doc(inline)]
pub use self::config::Params;

pub use self::coarse::CoarseTable;
pub use self::error::Error;
pub use self::error::Site;
pub use self::fine::FineTable;
pub use self::public::HashTable;
