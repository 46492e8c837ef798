//! Sample-by-sample filters.
//!
//! The sync detector and the burst analyzer run their filters one sample at a
//! time and restart them at fixed levels, so every filter here is a
//! [`Scanner`] that can also be [`Reset`].

pub mod design;
pub mod fir;

pub use self::fir::FirFilter;

/// A stateful per-sample processor.
///
/// The pulse detector in [`sync`](crate::sync) scans raw `u16` input and
/// outputs pulses. The FIR filters scan `f64`.
pub trait Scanner<S> {
    type Output;

    fn scan(&mut self, sample: S) -> Self::Output;
}

impl<T, S> Scanner<S> for &mut T
where
    T: Scanner<S> + ?Sized,
{
    type Output = T::Output;

    #[inline]
    fn scan(&mut self, sample: S) -> Self::Output {
        (&mut **self).scan(sample)
    }
}

/// Clears the history of a [`Scanner`] so it behaves as if it had only ever
/// seen `value`.
pub trait Reset<S> {
    fn reset(&mut self, value: S);
}

impl<T, S> Reset<S> for &mut T
where
    T: Reset<S> + ?Sized,
{
    #[inline]
    fn reset(&mut self, value: S) {
        (&mut **self).reset(value)
    }
}
