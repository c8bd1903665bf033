//! An instrumented lock for unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::lock::LockError;
use crate::lock::RawLock;

/// A lifecycle step observed by a [`Journal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
  Init(usize),
  Acquire(usize),
  Destroy(usize),
}

/// Shared record of every [`Probe`] event, with optional injected failures.
#[derive(Debug, Default)]
pub(crate) struct Journal {
  events: Mutex<Vec<Event>>,
  fail_init: Option<usize>,
  fail_acquire: Option<usize>,
  fail_destroy: Vec<usize>,
}

impl Journal {
  pub(crate) fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Injects failures into `init` of lock `init`, `acquire` of lock
  /// `acquire`, and `destroy` of every lock in `destroy`.
  pub(crate) fn failing(init: Option<usize>, acquire: Option<usize>, destroy: &[usize]) -> Arc<Self> {
    Arc::new(Self {
      events: Mutex::new(Vec::new()),
      fail_init: init,
      fail_acquire: acquire,
      fail_destroy: destroy.to_vec(),
    })
  }

  pub(crate) fn failing_init(id: usize) -> Arc<Self> {
    Self::failing(Some(id), None, &[])
  }

  pub(crate) fn failing_acquire(id: usize) -> Arc<Self> {
    Self::failing(None, Some(id), &[])
  }

  pub(crate) fn failing_destroy(ids: &[usize]) -> Arc<Self> {
    Self::failing(None, None, ids)
  }

  /// Builds the lock with ordinal `id`, for use with `try_new_with`.
  pub(crate) fn make(self: &Arc<Self>, id: usize) -> Result<Probe, LockError> {
    if self.fail_init == Some(id) {
      return Err(LockError::Failed { code: 12 });
    }

    self.push(Event::Init(id));

    Ok(Probe {
      id,
      journal: Some(Arc::clone(self)),
      inner: Mutex::new(()),
    })
  }

  pub(crate) fn events(&self) -> Vec<Event> {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub(crate) fn count(&self, f: fn(Event) -> bool) -> usize {
    self.events().into_iter().filter(|event| f(*event)).count()
  }

  fn push(&self, event: Event) {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
  }
}

/// A [`RawLock`] that reports to a [`Journal`].
#[derive(Debug)]
pub(crate) struct Probe {
  id: usize,
  journal: Option<Arc<Journal>>,
  inner: Mutex<()>,
}

impl RawLock for Probe {
  type Guard<'a> = MutexGuard<'a, ()>;

  fn init() -> Result<Self, LockError> {
    Ok(Self {
      id: 0,
      journal: None,
      inner: Mutex::new(()),
    })
  }

  fn acquire(&self) -> Result<Self::Guard<'_>, LockError> {
    if let Some(journal) = self.journal.as_deref() {
      if journal.fail_acquire == Some(self.id) {
        return Err(LockError::Failed { code: 35 });
      }

      journal.push(Event::Acquire(self.id));
    }

    self.inner.lock().map_err(|_| LockError::Poisoned)
  }

  fn destroy(self) -> Result<(), LockError> {
    if let Some(journal) = self.journal.as_deref() {
      journal.push(Event::Destroy(self.id));

      if journal.fail_destroy.contains(&self.id) {
        return Err(LockError::Failed { code: 16 });
      }
    }

    Ok(())
  }
}
