use log::debug;
use ndarray::{Array2, ArrayView2, s};

use crate::{
    FitErr, Result,
    field::{objective_grad, vector_field},
    kernel::Kernel,
    optimization::Optimizer,
    params::{FieldGrad, FieldParams},
};

/// Default number of trailing observations in the training window.
pub const DEFAULT_WINDOW: usize = 100;

/// Customary number of optimizer updates applied per fit step.
pub const DEFAULT_INNER_ITERS: usize = 3;

/// An RBF expansion of a vector field, fitted online to a trajectory by
/// one-step-ahead prediction.
///
/// The model owns the kernel capability, the optimizer and its state, the
/// global step counter and the window mask. All heavy numeric work happens
/// in pure batch operations; the only mutation is confined to the optimizer
/// state, the mask and the counter, so a `Rbfn` is single-threaded by
/// construction. Callers that need concurrent fitting use separate
/// instances.
pub struct Rbfn<K: Kernel, O: Optimizer> {
    kernel: K,
    optimizer: O,
    state: O::State,
    window: usize,
    mask: Array2<f32>,
    t: usize,
}

impl<K: Kernel, O: Optimizer> Rbfn<K, O> {
    /// Builds a model with the default window size of [`DEFAULT_WINDOW`].
    ///
    /// # Errors
    /// See [`Rbfn::with_window`].
    pub fn new(kernel: K, params: FieldParams, optimizer: O) -> Result<Self> {
        Self::with_window(kernel, params, optimizer, DEFAULT_WINDOW)
    }

    /// Builds a model with an explicit window size.
    ///
    /// The parameter record was already validated by [`FieldParams::new`],
    /// so the only configuration left to reject here is a window that
    /// cannot hold a single transition.
    ///
    /// # Arguments
    /// * `kernel` - The kernel capability.
    /// * `params` - The initial, validated parameter record.
    /// * `optimizer` - The optimization algorithm; its state is created here
    ///   and owned by the model for its lifetime.
    /// * `window` - Number of trailing observations per training window.
    ///
    /// # Errors
    /// Returns `FitErr::WindowTooSmall` when `window < 2`.
    pub fn with_window(kernel: K, params: FieldParams, optimizer: O, window: usize) -> Result<Self> {
        if window < 2 {
            return Err(FitErr::WindowTooSmall { got: window });
        }

        let state = optimizer.init(params);

        Ok(Self {
            kernel,
            optimizer,
            state,
            window,
            mask: Array2::zeros((window - 1, 1)),
            t: 1,
        })
    }

    /// The current parameter snapshot.
    pub fn params(&self) -> &FieldParams {
        self.optimizer.params(&self.state)
    }

    /// The kernel capability the model was built with.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The global step counter; starts at 1 and grows by one per fit step.
    pub fn step(&self) -> usize {
        self.t
    }

    /// The configured window size.
    pub fn window(&self) -> usize {
        self.window
    }

    /// The transition validity mask of the current window, shape
    /// (window − 1, 1).
    pub fn mask(&self) -> ArrayView2<'_, f32> {
        self.mask.view()
    }

    /// Evaluates the vector field at the current parameters. Read-only.
    ///
    /// # Arguments
    /// * `x` - A batch of state vectors, shape (N, d).
    pub fn query(&self, x: ArrayView2<f32>) -> Array2<f32> {
        vector_field(&self.kernel, x, self.params())
    }

    /// Computes the unmasked objective and its gradient at the current
    /// parameters without advancing training. Read-only diagnostics.
    ///
    /// # Arguments
    /// * `x` - A trajectory segment, shape (T, d) with T ≥ 2.
    pub fn evaluate_objective(&self, x: ArrayView2<f32>) -> (f32, FieldGrad) {
        objective_grad(&self.kernel, x, self.params(), None)
    }

    /// Runs `inner_iters` gradient evaluations and optimizer updates against
    /// the same window and mask, each at the parameters left by the previous
    /// update. The returned loss is the one computed in the last inner
    /// iteration, before that iteration's own update was applied, so the
    /// optimizer state is one update ahead of the returned value.
    ///
    /// Increments the step counter by exactly 1 regardless of `inner_iters`;
    /// with `inner_iters` of zero nothing is updated and NaN is returned.
    ///
    /// An optimizer stepping a decay or bandwidth entry out of the positive
    /// range is not detected here; it surfaces as NaN in later losses.
    /// Monitoring the returned loss trend is the caller's responsibility.
    ///
    /// # Arguments
    /// * `x` - The training window, shape (T, d) with T ≥ 2.
    /// * `inner_iters` - Updates per call; [`DEFAULT_INNER_ITERS`] is customary.
    /// * `mask` - Optional transition validity column, shape (T−1, 1).
    ///
    /// # Panics
    /// Panics if `x` has no rows or its width differs from the parameter
    /// dimension d.
    pub fn fit_step(
        &mut self,
        x: ArrayView2<f32>,
        inner_iters: usize,
        mask: Option<ArrayView2<f32>>,
    ) -> f32 {
        let mut value = f32::NAN;

        for _ in 0..inner_iters {
            let params = self.optimizer.params(&self.state);
            let (v, grad) = objective_grad(&self.kernel, x, params, mask);
            value = v;
            self.optimizer.update(self.t, &grad, &mut self.state);
        }

        debug!("fit step applied: t={} loss={value}", self.t);
        self.t += 1;
        value
    }

    /// The streaming entry point. Marks the transition that ends at the
    /// newest observation as valid, builds the training window and delegates
    /// to [`Rbfn::fit_step`].
    ///
    /// While the counter is below the window size the window is zero-padded:
    /// the first `t + 1` available rows of `x` fill its prefix and the rest
    /// stays zero (padded rows are still evaluated by the forward pass but
    /// carry zero mask weight). Once the counter reaches the window size the
    /// window slides instead: the trailing window-sized slice of `x` ending
    /// at the current step, with the mask all-ones and inert.
    ///
    /// # Arguments
    /// * `x` - The live trajectory observed so far, shape (T, d).
    /// * `inner_iters` - Updates per call; [`DEFAULT_INNER_ITERS`] is customary.
    ///
    /// # Panics
    /// Panics if `x` is empty, or holds fewer than `window` rows once the
    /// counter has reached the window size.
    pub fn fit_step_online(&mut self, x: ArrayView2<f32>, inner_iters: usize) -> f32 {
        if self.t < self.window {
            self.mask[[self.t - 1, 0]] = 1.0;

            let live = (self.t + 1).min(x.nrows());
            let mut z = Array2::zeros((self.window, x.ncols()));
            z.slice_mut(s![..live, ..]).assign(&x.slice(s![..live, ..]));

            debug!(live_rows = live; "online step in padded window: t={}", self.t);
            let mask = self.mask.clone();
            self.fit_step(z.view(), inner_iters, Some(mask.view()))
        } else {
            // the mask is already all-ones; no position left to mark
            let end = (self.t + 1).min(x.nrows());
            let z = x.slice(s![end - self.window..end, ..]);

            debug!("online step in sliding window: t={}", self.t);
            let mask = self.mask.clone();
            self.fit_step(z, inner_iters, Some(mask.view()))
        }
    }
}
