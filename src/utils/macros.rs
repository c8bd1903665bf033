/// Runs `$expr` once per bucket count, with `P` bound to the matching
/// [`ConstParams`].
///
/// [`ConstParams`]: crate::params::ConstParams
#[cfg(all(test, not(any(loom, shuttle))))]
macro_rules! each_capacity {
  ($expr:expr) => {
    #[cfg(any(coverage, coverage_nightly, miri))]
    {
      $crate::utils::each_capacity!(
        @impl $expr,
        0, 2, 8,
      );
    }

    #[cfg(not(any(coverage, coverage_nightly, miri)))]
    {
      $crate::utils::each_capacity!(
        @impl $expr,
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
      );
    }
  };
  (@impl $expr:expr, $($bits:expr),+ $(,)?) => {
    $(
      $crate::utils::each_capacity!(@run $expr, $bits);
    )+
  };
  (@run $expr:expr, $bits:expr) => {{
    type P = $crate::params::ConstParams::<{ 1 << $bits }>;
    $expr
  }};
}

macro_rules! log_debug {
  ($($arg:tt)+) => {{
    #[cfg(feature = "logging")]
    {
      ::log::debug!($($arg)+);
    }

    #[cfg(not(feature = "logging"))]
    {
      _ = ::core::format_args!($($arg)+);
    }
  }};
}

macro_rules! log_error {
  ($($arg:tt)+) => {{
    #[cfg(feature = "logging")]
    {
      ::log::error!($($arg)+);
    }

    #[cfg(not(feature = "logging"))]
    {
      _ = ::core::format_args!($($arg)+);
    }
  }};
}

#[cfg(all(test, not(any(loom, shuttle))))]
pub(crate) use each_capacity;
pub(crate) use log_debug;
pub(crate) use log_error;
