//! Read-only per-particle passes.
//!
//! With the `parallel` feature the closures run on the rayon pool, otherwise
//! sequentially. Results land in a fresh buffer indexed like the input, so
//! callers apply them in a separate sequential pass.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Evaluate `f(i)` for every `i in 0..count`.
pub(crate) fn map_indices<T, F>(count: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..count).into_par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..count).map(f).collect()
    }
}

/// Run `f` on every element, in parallel when enabled. Only for updates that
/// touch nothing but the element itself.
pub(crate) fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        items.par_iter_mut().for_each(f);
    }

    #[cfg(not(feature = "parallel"))]
    {
        items.iter_mut().for_each(f);
    }
}
