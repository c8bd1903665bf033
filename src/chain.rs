//! Bucket chains.
//!
//! A [`Chain`] is the unordered, singly linked list of entries that share a
//! bucket. Mutation requires a [`Permit`] proving that the lock guarding the
//! chain is held; lookups take no lock at all.
//!
//! Lookups race with mutation by design. Links are published with release
//! stores and read with acquire loads, values live in atomic cells, and nodes
//! are only freed through `&mut Chain`. An unlocked reader can therefore miss
//! an entry whose insertion has not been published yet, or see the value
//! that a concurrent update is about to replace, but it never observes a torn
//! value or a freed node.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result;
use core::marker::PhantomData;
use core::ptr;

use crate::lock::RawLock;
use crate::sync::atomic::AtomicPtr;
use crate::sync::atomic::AtomicU32;
use crate::sync::atomic::Ordering::Acquire;
use crate::sync::atomic::Ordering::Relaxed;
use crate::sync::atomic::Ordering::Release;

// -----------------------------------------------------------------------------
// Chain
// -----------------------------------------------------------------------------

/// The entries of a single bucket.
///
/// Keys are borrowed for `'k`; the chain never copies or frees key storage.
pub(crate) struct Chain<'k> {
  head: AtomicPtr<Node<'k>>,
}

impl<'k> Chain<'k> {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      head: AtomicPtr::new(ptr::null_mut()),
    }
  }

  /// Returns the entry for `key`, if one has been published.
  #[inline]
  pub(crate) fn find(&self, key: &str) -> Option<&Node<'k>> {
    self.iter().find(|node| node.key == key)
  }

  /// Inserts `key` or overwrites its value in place.
  ///
  /// New entries are appended at the tail: the scan for an existing entry
  /// already ends there, and a single release store publishes the node
  /// without exposing readers to a partially linked chain.
  pub(crate) fn upsert(&self, key: &'k str, value: u32, _permit: &Permit<'_>) -> Upsert {
    let mut link: &AtomicPtr<Node<'k>> = &self.head;

    // Links only change under the permit we hold, so `Relaxed` suffices.
    while let Some(node) = self.node_at(link.load(Relaxed)) {
      if node.key == key {
        node.value.store(value, Release);
        return Upsert::Updated;
      }

      link = &node.next;
    }

    let node: *mut Node<'k> = Box::into_raw(Box::new(Node::new(key, value)));

    link.store(node, Release);

    Upsert::Inserted
  }

  #[inline]
  pub(crate) fn iter(&self) -> Iter<'_, 'k> {
    Iter {
      next: self.node_at(self.head.load(Acquire)),
    }
  }

  /// Frees every entry, returning how many were freed.
  pub(crate) fn clear(&mut self) -> usize {
    let mut count: usize = 0;
    let mut next: *mut Node<'k> = self.head.swap(ptr::null_mut(), Relaxed);

    while !next.is_null() {
      // SAFETY:
      // - `next` was created by `Box::into_raw` in `upsert`.
      // - `&mut self` means no reader holds a reference into the chain.
      // - The head was swapped out, so each node is reclaimed exactly once.
      let node: Box<Node<'k>> = unsafe { Box::from_raw(next) };

      next = node.next.load(Relaxed);
      count += 1;
    }

    count
  }

  #[inline]
  fn node_at(&self, node: *mut Node<'k>) -> Option<&Node<'k>> {
    // SAFETY:
    // - Non-null links always come from `Box::into_raw` in `upsert` and are
    //   published with `Release` after the node is fully written.
    // - Nodes are only freed by `clear` or `drop`, both of which require
    //   exclusive access, so the node outlives the `&self` borrow.
    unsafe { node.as_ref() }
  }
}

impl Drop for Chain<'_> {
  fn drop(&mut self) {
    self.clear();
  }
}

impl Debug for Chain<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_map()
      .entries(self.iter().map(|node| (node.key(), node.value())))
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Node
// -----------------------------------------------------------------------------

/// A single `key => value` entry.
pub(crate) struct Node<'k> {
  key: &'k str,
  value: AtomicU32,
  next: AtomicPtr<Node<'k>>,
}

impl<'k> Node<'k> {
  #[inline]
  fn new(key: &'k str, value: u32) -> Self {
    Self {
      key,
      value: AtomicU32::new(value),
      next: AtomicPtr::new(ptr::null_mut()),
    }
  }

  #[inline]
  pub(crate) const fn key(&self) -> &'k str {
    self.key
  }

  #[inline]
  pub(crate) fn value(&self) -> u32 {
    self.value.load(Acquire)
  }
}

// -----------------------------------------------------------------------------
// Iterator
// -----------------------------------------------------------------------------

/// Unlocked iterator over the published entries of a chain.
pub(crate) struct Iter<'a, 'k> {
  next: Option<&'a Node<'k>>,
}

impl<'a, 'k> Iterator for Iter<'a, 'k> {
  type Item = &'a Node<'k>;

  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let node: &'a Node<'k> = self.next?;

    // SAFETY: See `Chain::node_at`; the chain is borrowed for `'a`.
    self.next = unsafe { node.next.load(Acquire).as_ref() };

    Some(node)
  }
}

// -----------------------------------------------------------------------------
// Permit
// -----------------------------------------------------------------------------

/// Proof token that the lock guarding a chain is held.
///
/// Only a [`RawLock`] guard can produce one, and the permit borrows that
/// guard, so it cannot outlive the critical section.
pub(crate) struct Permit<'lock> {
  marker: PhantomData<&'lock ()>,
}

impl<'lock> Permit<'lock> {
  #[inline]
  pub(crate) const fn new<'g, L>(_guard: &'lock L::Guard<'g>) -> Self
  where
    L: RawLock + 'g,
  {
    Self {
      marker: PhantomData,
    }
  }

  /// Creates a permit without holding any lock.
  #[cfg(all(test, not(any(loom, shuttle))))]
  pub(crate) const fn unlocked() -> Self {
    Self {
      marker: PhantomData,
    }
  }
}

// -----------------------------------------------------------------------------
// Upsert
// -----------------------------------------------------------------------------

/// Outcome of [`Chain::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Upsert {
  /// A new entry was appended.
  Inserted,
  /// An existing entry had its value overwritten.
  Updated,
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
