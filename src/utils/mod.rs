mod macros;
mod models;

#[cfg(all(test, not(any(loom, shuttle))))]
pub(crate) mod probe;

#[cfg(all(test, not(any(loom, shuttle))))]
pub(crate) use self::macros::each_capacity;
pub(crate) use self::macros::log_debug;
pub(crate) use self::macros::log_error;
pub(crate) use self::models::alloc;
pub(crate) use self::models::sync;
