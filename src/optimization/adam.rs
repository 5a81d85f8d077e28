use super::Optimizer;
use crate::params::{FieldGrad, FieldParams};

/// Adam optimization algorithm with bias-corrected moment estimates.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
}

/// The state threaded through [`Adam`] updates: the current parameters plus
/// exponential moving averages of the gradient and its square.
pub struct AdamState {
    params: FieldParams,
    first_moment: FieldGrad,
    second_moment: FieldGrad,
}

impl Adam {
    /// Returns a new `Adam` with the customary moment decays (0.9, 0.999)
    /// and epsilon 1e-8.
    ///
    /// # Arguments
    /// * `learning_rate` - The base step length before moment scaling.
    pub fn new(learning_rate: f32) -> Self {
        Self::with_moments(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Returns a new `Adam` with explicit moment decays.
    ///
    /// # Arguments
    /// * `learning_rate` - The base step length before moment scaling.
    /// * `beta1` - Decay of the first-moment average.
    /// * `beta2` - Decay of the second-moment average.
    /// * `eps` - Denominator guard.
    pub fn with_moments(learning_rate: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            eps,
        }
    }
}

impl Optimizer for Adam {
    type State = AdamState;

    fn init(&self, params: FieldParams) -> AdamState {
        let first_moment = FieldGrad::zeros_like(&params);
        let second_moment = FieldGrad::zeros_like(&params);

        AdamState {
            params,
            first_moment,
            second_moment,
        }
    }

    /// Advances the moment averages and takes a bias-corrected step.
    /// The bias correction divides by `1 − βᵗ`, so `step` must start at 1.
    fn update(&self, step: usize, grad: &FieldGrad, state: &mut AdamState) {
        let c1 = 1.0 - self.beta1.powi(step as i32);
        let c2 = 1.0 - self.beta2.powi(step as i32);

        let scalars = state
            .params
            .iter_scalars_mut()
            .zip(grad.iter_scalars())
            .zip(state.first_moment.iter_scalars_mut())
            .zip(state.second_moment.iter_scalars_mut());

        for (((p, &g), m), v) in scalars {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;

            let m_hat = *m / c1;
            let v_hat = *v / c2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
        }
    }

    fn params<'a>(&self, state: &'a AdamState) -> &'a FieldParams {
        &state.params
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{Array1, Array2, arr2};

    fn params() -> FieldParams {
        FieldParams::new(
            Array2::zeros((2, 1)),
            Array1::ones(1),
            Array2::zeros((2, 1)),
            Array1::ones(2),
        )
        .unwrap()
    }

    #[test]
    fn test_first_step_is_a_signed_unit_step() {
        // with bias correction, the very first update reduces to
        // lr · g / (|g| + eps) ≈ lr · sign(g)
        let params = params();
        let mut grad = FieldGrad::zeros_like(&params);
        grad.weights = arr2(&[[3.0], [-0.25]]);

        let opt = Adam::new(0.01);
        let mut state = opt.init(params);
        opt.update(1, &grad, &mut state);

        let w = opt.params(&state).weights();
        assert!((w[[0, 0]] + 0.01).abs() < 1e-5);
        assert!((w[[1, 0]] - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_moments_accumulate_across_steps() {
        let params = params();
        let mut grad = FieldGrad::zeros_like(&params);
        grad.weights = arr2(&[[1.0], [1.0]]);

        let opt = Adam::new(0.1);
        let mut state = opt.init(params);

        opt.update(1, &grad, &mut state);
        let after_one = opt.params(&state).weights()[[0, 0]];
        opt.update(2, &grad, &mut state);
        let after_two = opt.params(&state).weights()[[0, 0]];

        assert!(after_one < 0.0);
        assert!(after_two < after_one);
        assert!(state.first_moment.weights()[[0, 0]] > 0.0);
        assert!(state.second_moment.weights()[[0, 0]] > 0.0);
    }

    #[test]
    fn test_zero_gradient_leaves_parameters_unchanged() {
        let params = params();
        let grad = FieldGrad::zeros_like(&params);

        let opt = Adam::new(0.1);
        let mut state = opt.init(params.clone());
        opt.update(1, &grad, &mut state);

        assert_eq!(opt.params(&state), &params);
    }
}
