use super::Optimizer;
use crate::params::{FieldGrad, FieldParams};

/// Gradient descent optimization algorithm.
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    type State = FieldParams;

    fn init(&self, params: FieldParams) -> FieldParams {
        params
    }

    /// Updates the parameters according to the algorithm's learning rule,
    /// that is, making a step in the opposite direction of the gradient,
    /// with a length of `learning_rate`.
    fn update(&self, _step: usize, grad: &FieldGrad, state: &mut FieldParams) {
        let lr = self.learning_rate;

        for (w, g) in state.iter_scalars_mut().zip(grad.iter_scalars()) {
            *w -= lr * g;
        }
    }

    fn params<'a>(&self, state: &'a FieldParams) -> &'a FieldParams {
        state
    }
}
