#![cfg(not(any(loom, shuttle)))]

use std::sync::Barrier;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use locktab::CoarseTable;
use locktab::ConstParams;
use locktab::FineTable;
use locktab::HashTable;
use locktab::lock::LockError;
use locktab::lock::RawLock;

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = if cfg!(miri) { 16 } else { 2048 };

fn thread_keys(thread: usize) -> Vec<String> {
  (0..KEYS_PER_THREAD)
    .map(|index| format!("t{thread}-k{index}"))
    .collect()
}

fn all_keys() -> Vec<Vec<String>> {
  (0..THREADS).map(thread_keys).collect()
}

fn value_of(thread: usize, index: usize) -> u32 {
  (thread * KEYS_PER_THREAD + index) as u32
}

// -----------------------------------------------------------------------------
// Tracking Lock
// -----------------------------------------------------------------------------

static HOLDERS: AtomicUsize = AtomicUsize::new(0);
static MAX_HOLDERS: AtomicUsize = AtomicUsize::new(0);

/// Records the highest number of threads inside any critical section at once.
struct Tracking {
  inner: Mutex<()>,
}

struct TrackingGuard<'a> {
  _inner: MutexGuard<'a, ()>,
}

impl Drop for TrackingGuard<'_> {
  fn drop(&mut self) {
    HOLDERS.fetch_sub(1, Ordering::SeqCst);
  }
}

impl RawLock for Tracking {
  type Guard<'a> = TrackingGuard<'a>;

  fn init() -> Result<Self, LockError> {
    Ok(Self {
      inner: Mutex::new(()),
    })
  }

  fn acquire(&self) -> Result<Self::Guard<'_>, LockError> {
    let inner: MutexGuard<'_, ()> = self.inner.lock().map_err(|_| LockError::Poisoned)?;
    let holders: usize = HOLDERS.fetch_add(1, Ordering::SeqCst) + 1;

    MAX_HOLDERS.fetch_max(holders, Ordering::SeqCst);

    Ok(TrackingGuard { _inner: inner })
  }

  fn destroy(self) -> Result<(), LockError> {
    Ok(())
  }
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

fn disjoint_writers<'k, T>(table: &T, keys: &'k [Vec<String>])
where
  T: HashTable<'k> + Sync,
{
  let barrier: Barrier = Barrier::new(THREADS);

  thread::scope(|scope| {
    for (thread, chunk) in keys.iter().enumerate() {
      let barrier: &Barrier = &barrier;

      scope.spawn(move || {
        barrier.wait();

        for (index, key) in chunk.iter().enumerate() {
          table.add(key, value_of(thread, index)).unwrap();
        }
      });
    }
  });

  assert_eq!(table.len(), THREADS * KEYS_PER_THREAD);

  for (thread, chunk) in keys.iter().enumerate() {
    for (index, key) in chunk.iter().enumerate() {
      assert!(table.contains(key));
      assert_eq!(table.get(key), value_of(thread, index));
    }
  }
}

fn contended_updates<'k, T>(table: &T, keys: &'k [String])
where
  T: HashTable<'k> + Sync,
{
  thread::scope(|scope| {
    for thread in 0..THREADS {
      scope.spawn(move || {
        for _ in 0..8 {
          for key in keys {
            table.add(key, thread as u32).unwrap();
          }
        }
      });
    }
  });

  assert_eq!(table.len(), keys.len());

  for key in keys {
    assert!((table.get(key) as usize) < THREADS);
  }
}

fn readers_and_writers<'k, T>(table: &T, keys: &'k [String])
where
  T: HashTable<'k> + Sync,
{
  thread::scope(|scope| {
    scope.spawn(|| {
      for (value, key) in (0..).zip(keys) {
        table.add(key, value).unwrap();
      }
    });

    for _ in 0..THREADS - 1 {
      scope.spawn(|| {
        for (value, key) in (0..).zip(keys) {
          if let Some(found) = table.lookup(key) {
            assert_eq!(found, value);
          }
        }
      });
    }
  });

  assert_eq!(table.len(), keys.len());
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[test]
fn test_coarse_disjoint_writers() {
  let keys: Vec<Vec<String>> = all_keys();
  let table: CoarseTable<'_, ConstParams<256>> = CoarseTable::new();

  disjoint_writers(&table, &keys);

  table.destroy().unwrap();
}

#[test]
fn test_fine_disjoint_writers() {
  let keys: Vec<Vec<String>> = all_keys();
  let table: FineTable<'_, ConstParams<256>> = FineTable::new();

  disjoint_writers(&table, &keys);

  table.destroy().unwrap();
}

#[test]
fn test_fine_disjoint_writers_single_bucket() {
  let keys: Vec<Vec<String>> = (0..THREADS)
    .map(|thread| thread_keys(thread).into_iter().take(64).collect())
    .collect();

  let table: FineTable<'_, ConstParams<1>> = FineTable::new();

  thread::scope(|scope| {
    for chunk in &keys {
      let table: &FineTable<'_, ConstParams<1>> = &table;

      scope.spawn(move || {
        for key in chunk {
          table.add(key, 0).unwrap();
        }
      });
    }
  });

  assert_eq!(table.len(), THREADS * 64);
}

#[test]
fn test_coarse_contended_updates() {
  let keys: Vec<String> = thread_keys(0).into_iter().take(32).collect();
  let table: CoarseTable<'_, ConstParams<8>> = CoarseTable::new();

  contended_updates(&table, &keys);
}

#[test]
fn test_fine_contended_updates() {
  let keys: Vec<String> = thread_keys(0).into_iter().take(32).collect();
  let table: FineTable<'_, ConstParams<8>> = FineTable::new();

  contended_updates(&table, &keys);
}

#[test]
fn test_coarse_readers_and_writers() {
  let keys: Vec<String> = thread_keys(0);
  let table: CoarseTable<'_, ConstParams<64>> = CoarseTable::new();

  readers_and_writers(&table, &keys);
}

#[test]
fn test_fine_readers_and_writers() {
  let keys: Vec<String> = thread_keys(0);
  let table: FineTable<'_, ConstParams<64>> = FineTable::new();

  readers_and_writers(&table, &keys);
}

#[test]
fn test_coarse_serializes_writers() {
  let keys: Vec<Vec<String>> = all_keys();
  let table: CoarseTable<'_, ConstParams<256>, Tracking> = CoarseTable::new();

  disjoint_writers(&table, &keys);

  assert_eq!(MAX_HOLDERS.load(Ordering::SeqCst), 1);
  assert_eq!(HOLDERS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_independent_tables() {
  let keys: Vec<String> = thread_keys(0).into_iter().take(256).collect();

  let table_a: CoarseTable<'_, ConstParams<16>> = CoarseTable::new();
  let table_b: CoarseTable<'_, ConstParams<16>> = CoarseTable::new();

  thread::scope(|scope| {
    scope.spawn(|| {
      for (value, key) in (0..).zip(&keys) {
        table_a.add(key, value).unwrap();
      }
    });

    scope.spawn(|| {
      for (value, key) in (0..).zip(&keys) {
        table_b.add(key, value + 1000).unwrap();
      }
    });
  });

  for (value, key) in (0..).zip(&keys) {
    assert_eq!(table_a.get(key), value);
    assert_eq!(table_b.get(key), value + 1000);
  }

  table_a.destroy().unwrap();
  table_b.destroy().unwrap();
}
