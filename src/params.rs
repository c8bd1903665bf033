use core::any;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::marker::PhantomData;
use core::mem;
use core::num::NonZeroUsize;

// -----------------------------------------------------------------------------
// Configurable Params
// -----------------------------------------------------------------------------

/// Configuration parameters shared by [`CoarseTable`] and [`FineTable`].
///
/// The bucket count of a table is fixed at compile time. The simplest way to
/// pick one is [`ConstParams`]:
///
/// ```
/// use locktab::{ConstParams, FineTable};
///
/// type SmallTable<'k> = FineTable<'k, ConstParams<64>>;
///
/// let table: SmallTable<'_> = FineTable::new();
/// assert_eq!(table.capacity(), 64);
/// ```
///
/// # Implementing `Params`
///
/// ```
/// use locktab::{Capacity, CoarseTable, Params};
///
/// struct Wide;
///
/// impl Params for Wide {
///   const LENGTH: Capacity = Capacity::new(1 << 16);
/// }
///
/// let table: CoarseTable<'_, Wide> = CoarseTable::new();
/// assert_eq!(table.capacity(), 1 << 16);
/// ```
///
/// [`Capacity::new`] clamps values to the valid range and rounds up to the
/// nearest power of two.
///
/// [`CoarseTable`]: crate::CoarseTable
/// [`FineTable`]: crate::FineTable
pub trait Params {
  /// The number of buckets in the table.
  ///
  /// This value is rounded up to the nearest power of two and clamped to
  /// <code>[Capacity::MIN]..=[Capacity::MAX]</code>.
  const LENGTH: Capacity = DefaultParams::LENGTH;
}

// -----------------------------------------------------------------------------
// Configurable Params - Extensions
// -----------------------------------------------------------------------------

/// Derived parameters computed from [`Params`].
///
/// Automatically implemented for all [`Params`] types.
///
/// # Example
///
/// ```
/// use locktab::config::{ConstParams, ParamsExt};
///
/// assert_eq!(<ConstParams<1024> as ParamsExt>::MASK, 1023);
/// println!("{:#?}", <ConstParams<1024> as ParamsExt>::debug());
/// ```
pub trait ParamsExt: Params + Sealed {
  /// Mask selecting a bucket index from a hash.
  ///
  /// Because [`Params::LENGTH`] is a power of two, `hash & MASK` equals
  /// `hash % LENGTH`.
  const MASK: usize = Self::LENGTH.as_usize() - 1;

  /// Number of hash bits that participate in bucket selection.
  const BITS: u32 = Self::LENGTH.log2();

  #[inline]
  fn debug() -> DebugParams<Self> {
    DebugParams {
      marker: PhantomData,
    }
  }
}

// -----------------------------------------------------------------------------
// Debug Params
// -----------------------------------------------------------------------------

/// A helper type for displaying [`Params`] configuration.
///
/// Returned by [`ParamsExt::debug`].
#[derive(Clone, Copy)]
pub struct DebugParams<P>
where
  P: ?Sized,
{
  marker: PhantomData<fn(P)>,
}

impl<P> Debug for DebugParams<P>
where
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct(any::type_name::<P>())
      .field("LENGTH", &P::LENGTH)
      .field("MASK", &format_args!("{:#x}", P::MASK))
      .field("BITS", &P::BITS)
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Default Params
// -----------------------------------------------------------------------------

/// The default table configuration with [`Capacity::DEF`] buckets.
///
/// ```
/// use locktab::{CoarseTable, DefaultParams};
///
/// // These are equivalent:
/// let table1: CoarseTable<'_> = CoarseTable::new();
/// let table2: CoarseTable<'_, DefaultParams> = CoarseTable::new();
///
/// assert_eq!(table1.capacity(), table2.capacity());
/// ```
#[derive(Clone, Copy)]
#[non_exhaustive]
pub struct DefaultParams;

impl Debug for DefaultParams {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&<Self as ParamsExt>::debug(), f)
  }
}

impl Params for DefaultParams {
  const LENGTH: Capacity = Capacity::DEF;
}

// -----------------------------------------------------------------------------
// Const-Generic Params
// -----------------------------------------------------------------------------

/// A [`Params`] implementation with compile-time configurable bucket count.
///
/// `N` is rounded up to the nearest power of two and clamped to
/// <code>[Capacity::MIN]..=[Capacity::MAX]</code>.
///
/// ```
/// use locktab::{CoarseTable, ConstParams};
///
/// // Values are rounded up to powers of two
/// let table: CoarseTable<'_, ConstParams<1000>> = CoarseTable::new();
/// assert_eq!(table.capacity(), 1024);
/// ```
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub struct ConstParams<const N: usize>;

impl<const N: usize> Params for ConstParams<N> {
  const LENGTH: Capacity = Capacity::new(N);
}

// -----------------------------------------------------------------------------
// Auto-implement Derive
// -----------------------------------------------------------------------------

mod private {
  pub trait Sealed {}
}

use private::Sealed;

impl<P> Sealed for P where P: Params + ?Sized {}
impl<P> ParamsExt for P where P: Params + ?Sized {}

// -----------------------------------------------------------------------------
// Capacity
// -----------------------------------------------------------------------------

/// A validated bucket count.
///
/// Represents a power-of-two value in the range <code>[MIN]..=[MAX]</code>.
///
/// ```
/// use locktab::Capacity;
///
/// assert_eq!(Capacity::new(4).as_usize(), 4);
/// assert_eq!(Capacity::new(100).as_usize(), 128);
/// assert_eq!(Capacity::new(0), Capacity::MIN);
/// assert_eq!(Capacity::new(usize::MAX), Capacity::MAX);
/// ```
///
/// [MIN]: Self::MIN
/// [MAX]: Self::MAX
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Capacity(CapacityEnum);

impl Capacity {
  /// The minimum supported bucket count (a single bucket).
  pub const MIN: Self = Self(CapacityEnum::_Capacity1Shl0);

  /// The maximum supported bucket count (2²⁴ buckets).
  pub const MAX: Self = Self(CapacityEnum::_Capacity1Shl24);

  /// The default bucket count (2¹² buckets).
  pub const DEF: Self = Self(CapacityEnum::_Capacity1Shl12);

  /// Creates a new [`Capacity`] from an arbitrary value.
  ///
  /// Rounds up to the nearest power of two and clamps to
  /// <code>[MIN]..=[MAX]</code>.
  ///
  /// [MIN]: Self::MIN
  /// [MAX]: Self::MAX
  #[inline]
  pub const fn new(value: usize) -> Self {
    let Some(capacity) = value.checked_next_power_of_two() else {
      return Self::MAX;
    };

    if capacity < Self::MIN.as_usize() {
      Self::MIN
    } else if capacity > Self::MAX.as_usize() {
      Self::MAX
    } else {
      // SAFETY: `capacity` is a power of two inside `MIN..=MAX`.
      unsafe { Self::new_unchecked(capacity) }
    }
  }

  /// Creates a new [`Capacity`] without validation.
  ///
  /// # Safety
  ///
  /// `value` must be a power of two in <code>[MIN]..=[MAX]</code>.
  ///
  /// [MIN]: Self::MIN
  /// [MAX]: Self::MAX
  #[inline]
  pub const unsafe fn new_unchecked(value: usize) -> Self {
    // SAFETY: Caller guarantees `value` is a valid `Capacity`.
    unsafe { mem::transmute::<usize, Self>(value) }
  }

  /// Returns the capacity as a [`usize`].
  #[inline]
  pub const fn as_usize(self) -> usize {
    self.0 as usize
  }

  /// Returns the capacity as a [`NonZeroUsize`].
  #[inline]
  pub const fn as_nonzero(self) -> NonZeroUsize {
    // SAFETY: All `Capacity` values are non-zero by construction.
    unsafe { mem::transmute::<Self, NonZeroUsize>(self) }
  }

  /// Returns the base-2 logarithm of the capacity.
  ///
  /// ```
  /// use locktab::Capacity;
  ///
  /// assert_eq!(Capacity::new(4096).log2(), 12);
  /// assert_eq!(Capacity::MIN.log2(), 0);
  /// ```
  #[inline]
  pub const fn log2(self) -> u32 {
    self.as_nonzero().trailing_zeros()
  }
}

impl Debug for Capacity {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{:?} (1 << {:?})", self.as_nonzero(), self.log2())
  }
}

impl Default for Capacity {
  #[inline]
  fn default() -> Self {
    Self::DEF
  }
}

impl From<Capacity> for NonZeroUsize {
  #[inline]
  fn from(other: Capacity) -> Self {
    other.as_nonzero()
  }
}

impl From<Capacity> for usize {
  #[inline]
  fn from(other: Capacity) -> Self {
    other.as_usize()
  }
}

#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
enum CapacityEnum {
  _Capacity1Shl0 = 1 << 0,
  _Capacity1Shl1 = 1 << 1,
  _Capacity1Shl2 = 1 << 2,
  _Capacity1Shl3 = 1 << 3,
  _Capacity1Shl4 = 1 << 4,
  _Capacity1Shl5 = 1 << 5,
  _Capacity1Shl6 = 1 << 6,
  _Capacity1Shl7 = 1 << 7,
  _Capacity1Shl8 = 1 << 8,
  _Capacity1Shl9 = 1 << 9,
  _Capacity1Shl10 = 1 << 10,
  _Capacity1Shl11 = 1 << 11,
  _Capacity1Shl12 = 1 << 12,
  _Capacity1Shl13 = 1 << 13,
  _Capacity1Shl14 = 1 << 14,
  _Capacity1Shl15 = 1 << 15,
  _Capacity1Shl16 = 1 << 16,
  _Capacity1Shl17 = 1 << 17,
  _Capacity1Shl18 = 1 << 18,
  _Capacity1Shl19 = 1 << 19,
  _Capacity1Shl20 = 1 << 20,
  _Capacity1Shl21 = 1 << 21,
  _Capacity1Shl22 = 1 << 22,
  _Capacity1Shl23 = 1 << 23,
  _Capacity1Shl24 = 1 << 24,
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
