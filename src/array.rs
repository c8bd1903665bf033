//! Cache-aligned bucket storage.
//!
//! Provides [`Array`], the fixed backing storage for table buckets.

use core::convert::Infallible;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::mem::MaybeUninit;
use core::ptr;
use core::ptr::NonNull;
use core::slice;

use crate::alloc::Layout;
use crate::alloc::alloc;
use crate::alloc::dealloc;
use crate::alloc::handle_alloc_error;
use crate::index::Slot;
use crate::params::Params;

/// Alignment of the bucket allocation.
const ALIGN: usize = 128;

/// A fixed-size array of [`P::LENGTH`] elements with cache-line-aligned
/// allocation.
///
/// [`P::LENGTH`]: Params::LENGTH
pub(crate) struct Array<T, P>
where
  P: Params + ?Sized,
{
  nonnull: NonNull<T>,
  phantom: PhantomData<(T, fn(P))>,
}

impl<T, P> Array<T, P>
where
  P: Params + ?Sized,
{
  /// Creates a new array, initializing each element with the given function.
  #[inline]
  pub(crate) fn new<F>(mut init: F) -> Self
  where
    F: FnMut(usize) -> T,
  {
    let result: Result<Self, Infallible> = Self::try_new(|index| Ok(init(index)), |_, _| {});

    match result {
      Ok(this) => this,
      Err(never) => match never {},
    }
  }

  /// Creates a new array, initializing each element with a fallible function.
  ///
  /// If `init` fails for index `i`, the elements `0..i` are handed to `undo`
  /// in ascending order and the allocation is released before the error is
  /// returned.
  pub(crate) fn try_new<E, F, U>(mut init: F, mut undo: U) -> Result<Self, E>
  where
    F: FnMut(usize) -> Result<T, E>,
    U: FnMut(usize, T),
  {
    let this: Array<MaybeUninit<T>, P> = Self::new_uninit();

    for index in 0..P::LENGTH.as_usize() {
      match init(index) {
        Ok(value) => {
          // SAFETY: `index < P::LENGTH` and the allocation holds `P::LENGTH`
          // elements; nothing else references the new allocation.
          unsafe {
            this.nonnull.add(index).write(MaybeUninit::new(value));
          }
        }
        Err(error) => {
          for done in 0..index {
            // SAFETY: Elements `0..index` were written by earlier iterations
            // and each one is moved out exactly once.
            let value: T = unsafe { this.nonnull.add(done).read().assume_init() };

            undo(done, value);
          }

          // Dropping `MaybeUninit` elements is a no-op; only the allocation
          // is released here.
          drop(this);

          return Err(error);
        }
      }
    }

    // SAFETY: All `P::LENGTH` elements initialized by the loop.
    Ok(unsafe { this.assume_init() })
  }

  /// Creates a new array without initializing its contents.
  #[inline]
  fn new_uninit() -> Array<MaybeUninit<T>, P> {
    let layout: Layout = Self::layout();

    assert_ne!(layout.size(), 0, "invalid params: bucket layout size is `0`");

    // SAFETY: `layout` has non-zero size.
    let raw: *mut u8 = unsafe { alloc(layout) };

    Array {
      nonnull: match NonNull::new(raw.cast()) {
        Some(ptr) => ptr,
        None => handle_alloc_error(layout),
      },
      phantom: PhantomData,
    }
  }

  #[inline]
  fn layout() -> Layout {
    match Layout::array::<T>(P::LENGTH.as_usize()) {
      Ok(layout) => match layout.align_to(ALIGN) {
        Ok(layout) => layout,
        Err(_) => capacity_overflow(),
      },
      Err(_) => capacity_overflow(),
    }
  }

  #[inline]
  pub(crate) const fn as_ptr(&self) -> *const T {
    self.nonnull.as_ptr()
  }

  #[inline]
  pub(crate) const fn as_slice(&self) -> &[T] {
    // SAFETY: Contiguous allocation of `P::LENGTH` initialized elements.
    unsafe { slice::from_raw_parts(self.as_ptr(), P::LENGTH.as_usize()) }
  }

  #[inline]
  pub(crate) const fn as_mut_slice(&mut self) -> &mut [T] {
    // SAFETY: Contiguous allocation of `P::LENGTH` initialized elements, and
    // `&mut self` guarantees exclusive access.
    unsafe { slice::from_raw_parts_mut(self.nonnull.as_ptr(), P::LENGTH.as_usize()) }
  }

  /// Returns a reference to the element at the given bucket.
  #[inline]
  pub(crate) const fn get(&self, slot: Slot<P>) -> &T {
    // SAFETY: `Slot<P>` values are always less than `P::LENGTH`.
    unsafe { self.nonnull.add(slot.get()).as_ref() }
  }

  /// Consumes the array, moving each element into `f` in ascending order.
  ///
  /// The allocation is released once every element has been visited.
  pub(crate) fn into_each<F>(self, mut f: F)
  where
    F: FnMut(usize, T),
  {
    // Elements are moved out one by one; `Drop` must not see them again.
    let this: ManuallyDrop<Self> = ManuallyDrop::new(self);

    for index in 0..P::LENGTH.as_usize() {
      // SAFETY: Every element is initialized and read exactly once.
      let value: T = unsafe { this.nonnull.add(index).read() };

      f(index, value);
    }

    // SAFETY: Allocated with `Self::layout()` in `new_uninit`.
    unsafe {
      dealloc(this.nonnull.cast().as_ptr(), Self::layout());
    }
  }
}

impl<T, P> Array<MaybeUninit<T>, P>
where
  P: Params + ?Sized,
{
  /// Converts to an initialized array.
  ///
  /// # Safety
  ///
  /// All [`P::LENGTH`] elements must be initialized.
  ///
  /// [`P::LENGTH`]: Params::LENGTH
  #[inline]
  unsafe fn assume_init(self) -> Array<T, P> {
    Array {
      // Prevent drop from running on `self` (would deallocate).
      nonnull: ManuallyDrop::new(self).nonnull.cast(),
      phantom: PhantomData,
    }
  }
}

impl<T, P> Drop for Array<T, P>
where
  P: Params + ?Sized,
{
  fn drop(&mut self) {
    // SAFETY:
    // - Every element is initialized (or `MaybeUninit`, which has no drop).
    // - `&mut self` guarantees nothing else observes the elements.
    // - The allocation was made with `Self::layout()` in `new_uninit`.
    unsafe {
      ptr::drop_in_place(self.as_mut_slice());
      dealloc(self.nonnull.cast().as_ptr(), Self::layout());
    }
  }
}

// SAFETY: `Array` owns its elements like a `Box<[T]>`.
unsafe impl<T, P> Send for Array<T, P>
where
  T: Send,
  P: Params + ?Sized,
{
}

// SAFETY: `Array` only hands out `&T` through `&self`.
unsafe impl<T, P> Sync for Array<T, P>
where
  T: Sync,
  P: Params + ?Sized,
{
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
  panic!("invalid params: bucket array exceeds `isize::MAX` bytes");
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
