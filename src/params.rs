use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{FitErr, Result};

/// The parameter record of an RBF vector field.
///
/// Holds the basis weights `W` (K, d), the per-dimension or scalar decay `τ`
/// ((d,) or (1,)), the basis centers `c` (K, d) and the per-center
/// bandwidths `σ` (K,). The shape and positivity invariants are checked once
/// in [`FieldParams::new`]; afterwards the fields can only be reached through
/// read accessors and scalar iteration, so no same-shape invariant can be
/// broken by an optimizer update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldParams {
    weights: Array2<f32>,
    decay: Array1<f32>,
    centers: Array2<f32>,
    widths: Array1<f32>,
}

impl FieldParams {
    /// Validates and builds a parameter record.
    ///
    /// # Arguments
    /// * `weights` - Basis weights, shape (K, d).
    /// * `decay` - Decay parameters, shape (d,) or (1,), strictly positive.
    /// * `centers` - Basis centers, shape (K, d).
    /// * `widths` - Per-center bandwidths, shape (K,), strictly positive.
    ///
    /// # Errors
    /// Returns a `FitErr` when the shapes disagree or a decay/bandwidth entry
    /// is not strictly positive. No partial record is produced.
    pub fn new(
        weights: Array2<f32>,
        decay: Array1<f32>,
        centers: Array2<f32>,
        widths: Array1<f32>,
    ) -> Result<Self> {
        if weights.dim() != centers.dim() {
            return Err(FitErr::ShapeMismatch {
                a: "weights",
                b: "centers",
                got: centers.dim(),
                expected: weights.dim(),
            });
        }

        if widths.len() != weights.nrows() {
            return Err(FitErr::WidthCountMismatch {
                got: widths.len(),
                expected: weights.nrows(),
            });
        }

        if decay.len() != 1 && decay.len() != weights.ncols() {
            return Err(FitErr::DecayLengthMismatch {
                got: decay.len(),
                dims: weights.ncols(),
            });
        }

        if !decay.iter().all(|v| *v > 0.0) {
            return Err(FitErr::NonPositive { what: "decay" });
        }

        if !widths.iter().all(|v| *v > 0.0) {
            return Err(FitErr::NonPositive { what: "widths" });
        }

        Ok(Self {
            weights,
            decay,
            centers,
            widths,
        })
    }

    /// Builds a randomly initialized record: weights near zero, centers drawn
    /// from a normal distribution scaled by `spread`, scalar decay of one and
    /// uniform bandwidths of `spread`.
    ///
    /// # Arguments
    /// * `n_centers` - The number of basis centers K.
    /// * `dims` - The state dimension d.
    /// * `spread` - The length scale of the region the data is expected to
    ///   occupy, strictly positive.
    /// * `rng` - A random number generator.
    ///
    /// # Errors
    /// Returns `FitErr::NonPositive` when `spread` is not strictly positive.
    pub fn init<R: Rng + ?Sized>(
        n_centers: usize,
        dims: usize,
        spread: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if !(spread > 0.0) {
            return Err(FitErr::NonPositive { what: "spread" });
        }

        let weights: Array2<f32> = Array2::random_using((n_centers, dims), StandardNormal, rng);
        let centers: Array2<f32> = Array2::random_using((n_centers, dims), StandardNormal, rng);

        Self::new(
            weights * 1e-2,
            Array1::ones(1),
            centers * spread,
            Array1::from_elem(n_centers, spread),
        )
    }

    /// The basis weight matrix `W`, shape (K, d).
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// The decay parameters `τ`, shape (d,) or (1,).
    pub fn decay(&self) -> &Array1<f32> {
        &self.decay
    }

    /// The basis center matrix `c`, shape (K, d).
    pub fn centers(&self) -> &Array2<f32> {
        &self.centers
    }

    /// The per-center bandwidths `σ`, shape (K,).
    pub fn widths(&self) -> &Array1<f32> {
        &self.widths
    }

    /// Iterates every scalar parameter in a fixed field order (weights,
    /// decay, centers, widths), matching [`FieldGrad::iter_scalars`].
    pub fn iter_scalars(&self) -> impl Iterator<Item = &f32> {
        self.weights
            .iter()
            .chain(self.decay.iter())
            .chain(self.centers.iter())
            .chain(self.widths.iter())
    }

    /// Mutable scalar iteration in the same fixed field order. This is the
    /// only mutable access to the record, so updates can change values but
    /// never shapes.
    pub fn iter_scalars_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.weights
            .iter_mut()
            .chain(self.decay.iter_mut())
            .chain(self.centers.iter_mut())
            .chain(self.widths.iter_mut())
    }
}

/// The gradient of the training objective with respect to a [`FieldParams`]
/// record. Field shapes always match the record the gradient was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrad {
    pub(crate) weights: Array2<f32>,
    pub(crate) decay: Array1<f32>,
    pub(crate) centers: Array2<f32>,
    pub(crate) widths: Array1<f32>,
}

impl FieldGrad {
    /// An all-zero gradient with the shapes of `params`. Also the moment
    /// buffer layout used by stateful optimizers.
    pub fn zeros_like(params: &FieldParams) -> Self {
        Self {
            weights: Array2::zeros(params.weights.dim()),
            decay: Array1::zeros(params.decay.len()),
            centers: Array2::zeros(params.centers.dim()),
            widths: Array1::zeros(params.widths.len()),
        }
    }

    /// The gradient with respect to the weights, shape (K, d).
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// The gradient with respect to the decay, shape (d,) or (1,).
    pub fn decay(&self) -> &Array1<f32> {
        &self.decay
    }

    /// The gradient with respect to the centers, shape (K, d).
    pub fn centers(&self) -> &Array2<f32> {
        &self.centers
    }

    /// The gradient with respect to the bandwidths, shape (K,).
    pub fn widths(&self) -> &Array1<f32> {
        &self.widths
    }

    /// Iterates every scalar in the same fixed field order as
    /// [`FieldParams::iter_scalars`].
    pub fn iter_scalars(&self) -> impl Iterator<Item = &f32> {
        self.weights
            .iter()
            .chain(self.decay.iter())
            .chain(self.centers.iter())
            .chain(self.widths.iter())
    }

    /// Mutable scalar iteration, used by optimizers for moment buffers.
    pub fn iter_scalars_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.weights
            .iter_mut()
            .chain(self.decay.iter_mut())
            .chain(self.centers.iter_mut())
            .chain(self.widths.iter_mut())
    }
}
