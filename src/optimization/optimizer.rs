use crate::params::{FieldGrad, FieldParams};

/// An optimization algorithm over a [`FieldParams`] record.
///
/// The algorithm's bookkeeping (moment estimates, the parameter snapshot
/// itself) lives in an opaque `State` produced by `init` and threaded
/// through every `update` call. A model owns exactly one state for its
/// lifetime and reads the current parameters back through `params`.
pub trait Optimizer {
    /// Optimizer-local state advanced by [`Optimizer::update`].
    type State;

    /// Wraps an initial parameter record into a fresh state.
    fn init(&self, params: FieldParams) -> Self::State;

    /// Applies one update to the state.
    ///
    /// # Arguments
    /// * `step` - The global step counter, starting at 1.
    /// * `grad` - The objective gradient at the state's current parameters.
    /// * `state` - The state to advance in place.
    fn update(&self, step: usize, grad: &FieldGrad, state: &mut Self::State);

    /// The current parameter snapshot held by `state`.
    fn params<'a>(&self, state: &'a Self::State) -> &'a FieldParams;
}
