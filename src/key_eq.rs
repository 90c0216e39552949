//! Key equality predicates used when scanning a chain.

use core::borrow::Borrow;

/// Decides whether a stored key matches a probe.
///
/// `Q` is the borrowed form used for lookups; it defaults to the key type so
/// custom predicates only need `impl KeyEq<K> for MyEq`. Implementations
/// must agree with the map's hasher: keys that compare equal must hash the
/// same, otherwise a matching entry may live in a bucket that is never
/// scanned.
pub trait KeyEq<K: ?Sized, Q: ?Sized = K> {
    fn equivalent(&self, stored: &K, probe: &Q) -> bool;
}

/// Structural equality through `Borrow` + `Eq`, mirroring `std::collections::HashMap`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultEq;

impl<K, Q> KeyEq<K, Q> for DefaultEq
where
    K: ?Sized + Borrow<Q>,
    Q: ?Sized + Eq,
{
    #[inline]
    fn equivalent(&self, stored: &K, probe: &Q) -> bool {
        stored.borrow() == probe
    }
}
