use std::{
    collections::VecDeque,
    iter,
    ops::{
        Add,
        Mul,
    },
};

use num_traits::{
    Float,
    FloatConst,
    FromPrimitive,
};

use crate::filter::{
    Reset,
    Scanner,
};

#[derive(Clone, Debug)]
pub struct FirFilter<S, C> {
    coefficients: Vec<C>,
    delayed: VecDeque<S>,
}

impl<S, C> FirFilter<S, C> {
    #[inline]
    pub fn new(coefficients: Vec<C>) -> Self {
        assert!(coefficients.len() > 1);

        let delayed = VecDeque::with_capacity(coefficients.len() - 1);

        Self {
            coefficients,
            delayed,
        }
    }

    #[inline]
    pub fn coefficients(&self) -> &[C] {
        &self.coefficients
    }

    #[inline]
    pub fn num_taps(&self) -> usize {
        self.coefficients.len()
    }
}

impl<S, C> Scanner<S> for FirFilter<S, C>
where
    S: Copy + Mul<C, Output = S> + Add<S, Output = S>,
    C: Copy,
{
    type Output = S;

    fn scan(&mut self, sample: S) -> Self::Output {
        debug_assert!(self.delayed.len() < self.coefficients.len());

        let mut output = sample * self.coefficients[0];
        for (delayed, coeff) in self.delayed.iter().zip(&self.coefficients[1..]) {
            output = output + *delayed * *coeff;
        }

        if self.delayed.len() == self.coefficients.len() - 1 {
            self.delayed.pop_back();
        }
        self.delayed.push_front(sample);

        output
    }
}

impl<S: Copy, C> Reset<S> for FirFilter<S, C> {
    fn reset(&mut self, value: S) {
        self.delayed.clear();
        self.delayed
            .extend(iter::repeat_n(value, self.coefficients.len() - 1));
    }
}

/// Hann window with `n + 1` points. Both end points are zero.
pub fn hann_window<T>(n: usize) -> impl Iterator<Item = T>
where
    T: Float + FloatConst + FromPrimitive,
{
    let n_t = T::from_usize(n).unwrap_or_else(T::one);
    (0..=n).map(move |i| {
        let i_t = T::from_usize(i).unwrap_or_else(T::zero);
        (T::PI() * i_t / n_t).sin().powi(2)
    })
}
