#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;
use loom::thread::JoinHandle;
use std::ops::Deref;

use locktab::Capacity;
use locktab::CoarseTable;
use locktab::ConstParams;
use locktab::Error;
use locktab::FineTable;
use locktab::HashTable;
use locktab::Params;

type Single = ConstParams<{ Capacity::MIN.as_usize() }>;
type Pair = ConstParams<2>;

type Add = JoinHandle<Result<(), Error>>;
type Lookup = JoinHandle<Option<u32>>;

struct LoomTable<T> {
  inner: Arc<T>,
}

impl<T> LoomTable<T>
where
  T: HashTable<'static> + Send + Sync + 'static,
{
  fn new(table: T) -> Self {
    Self {
      inner: Arc::new(table),
    }
  }

  fn spawn_add(&self, key: &'static str, value: u32) -> Add {
    let table: Arc<T> = Arc::clone(&self.inner);
    thread::spawn(move || table.add(key, value))
  }

  fn spawn_lookup(&self, key: &'static str) -> Lookup {
    let table: Arc<T> = Arc::clone(&self.inner);
    thread::spawn(move || table.lookup(key))
  }
}

impl<T> Deref for LoomTable<T> {
  type Target = T;

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

fn coarse<P>() -> LoomTable<CoarseTable<'static, P>>
where
  P: Params + 'static,
{
  LoomTable::new(CoarseTable::new())
}

fn fine<P>() -> LoomTable<FineTable<'static, P>>
where
  P: Params + 'static,
{
  LoomTable::new(FineTable::new())
}

// -----------------------------------------------------------------------------
// Shared Scenarios
// -----------------------------------------------------------------------------

fn add_distinct<T>(table: LoomTable<T>)
where
  T: HashTable<'static> + Send + Sync + 'static,
{
  let add_a: Add = table.spawn_add("a", 1);
  let add_b: Add = table.spawn_add("b", 2);

  add_a.join().unwrap().unwrap();
  add_b.join().unwrap().unwrap();

  assert_eq!(table.get("a"), 1);
  assert_eq!(table.get("b"), 2);
  assert_eq!(table.len(), 2);
}

fn add_same_key<T>(table: LoomTable<T>)
where
  T: HashTable<'static> + Send + Sync + 'static,
{
  let add_a: Add = table.spawn_add("k", 1);
  let add_b: Add = table.spawn_add("k", 2);

  add_a.join().unwrap().unwrap();
  add_b.join().unwrap().unwrap();

  let value: u32 = table.get("k");

  assert!(value == 1 || value == 2, "lost update: {value}");
  assert_eq!(table.len(), 1);
}

fn lookup_during_add<T>(table: LoomTable<T>)
where
  T: HashTable<'static> + Send + Sync + 'static,
{
  table.add("x", 1).unwrap();

  let add: Add = table.spawn_add("y", 2);
  let lookup_x: Lookup = table.spawn_lookup("x");
  let lookup_y: Lookup = table.spawn_lookup("y");

  add.join().unwrap().unwrap();

  assert_eq!(lookup_x.join().unwrap(), Some(1));

  if let Some(value) = lookup_y.join().unwrap() {
    assert_eq!(value, 2);
  }

  assert_eq!(table.get("y"), 2);
}

fn lookup_during_update<T>(table: LoomTable<T>)
where
  T: HashTable<'static> + Send + Sync + 'static,
{
  table.add("x", 1).unwrap();

  let add: Add = table.spawn_add("x", 2);
  let lookup: Lookup = table.spawn_lookup("x");

  add.join().unwrap().unwrap();

  let seen: Option<u32> = lookup.join().unwrap();

  assert!(seen == Some(1) || seen == Some(2), "torn read: {seen:?}");
  assert_eq!(table.get("x"), 2);
}

// -----------------------------------------------------------------------------
// Coarse
// -----------------------------------------------------------------------------

#[test]
fn test_coarse_add_distinct() {
  loom::model(|| add_distinct(coarse::<Single>()));
}

#[test]
fn test_coarse_add_same_key() {
  loom::model(|| add_same_key(coarse::<Single>()));
}

#[test]
fn test_coarse_lookup_during_add() {
  loom::model(|| lookup_during_add(coarse::<Single>()));
}

#[test]
fn test_coarse_lookup_during_update() {
  loom::model(|| lookup_during_update(coarse::<Single>()));
}

// -----------------------------------------------------------------------------
// Fine
// -----------------------------------------------------------------------------

#[test]
fn test_fine_add_distinct() {
  loom::model(|| add_distinct(fine::<Pair>()));
}

#[test]
fn test_fine_add_distinct_single_bucket() {
  loom::model(|| add_distinct(fine::<Single>()));
}

#[test]
fn test_fine_add_same_key() {
  loom::model(|| add_same_key(fine::<Pair>()));
}

#[test]
fn test_fine_lookup_during_add() {
  loom::model(|| lookup_during_add(fine::<Single>()));
}

#[test]
fn test_fine_lookup_during_update() {
  loom::model(|| lookup_during_update(fine::<Pair>()));
}
