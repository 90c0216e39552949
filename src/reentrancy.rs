//! Debug-only detection of map calls made from inside user callbacks.
//!
//! `ChainedHashMap` runs user code (`Hash` and `KeyEq`) only while it
//! hashes a probe or walks a chain. Each of those stretches goes through
//! [`ReentrancyCheck::run`] with the name of the public operation that owns
//! it. If the callback calls back into the same map, debug builds panic
//! with both operation names instead of letting the inner call observe a
//! half-updated chain. Release builds keep no state.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    // Operation whose user code is running right now.
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // The map is single-threaded; keep it !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Run `f`, the user-code section of operation `op`.
    ///
    /// In debug builds, panics if another operation's section is already
    /// running on this map.
    #[inline]
    pub(crate) fn run<R>(&self, op: &'static str, f: impl FnOnce() -> R) -> R {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!(
                    "reentrancy detected: ChainedHashMap::{op} called from user code \
                     running inside ChainedHashMap::{outer}"
                );
            }
            self.active.set(Some(op));
            let _reset = ResetOnExit(&self.active);
            f()
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            f()
        }
    }
}

impl Default for ReentrancyCheck {
    fn default() -> Self {
        Self::new()
    }
}

// Clears the active operation on return and on unwind.
#[cfg(debug_assertions)]
struct ResetOnExit<'a>(&'a Cell<Option<&'static str>>);

#[cfg(debug_assertions)]
impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        self.0.set(None);
    }
}
