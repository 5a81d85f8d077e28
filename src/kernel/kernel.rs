use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// A pluggable radial-basis kernel.
///
/// The model treats the kernel as an opaque capability: it only relies on
/// the shape contract below, never on the kernel family. Implementations
/// must be pure (no side effects, no internal state observable through
/// these calls).
pub trait Kernel {
    /// Evaluates the basis responses of every center to every point.
    ///
    /// # Arguments
    /// * `x` - A batch of N state vectors, shape (N, d).
    /// * `centers` - The K basis centers, shape (K, d).
    /// * `widths` - The K per-center bandwidths.
    ///
    /// # Returns
    /// A matrix of shape (N, K) of non-negative responses; row `i` holds the
    /// responses of all K centers to point `i`.
    fn responses(
        &self,
        x: ArrayView2<f32>,
        centers: ArrayView2<f32>,
        widths: ArrayView1<f32>,
    ) -> Array2<f32>;

    /// The adjoint of [`Kernel::responses`]: the vector-Jacobian product of
    /// the response matrix against an upstream weight matrix.
    ///
    /// Training differentiates the objective through the kernel without
    /// inspecting it, so every kernel carries its own backward pass, the way
    /// a layer pairs `forward` with `backward`.
    ///
    /// # Arguments
    /// * `x`, `centers`, `widths` - The same arguments the forward pass saw.
    /// * `upstream` - dL/dΦ, shape (N, K).
    ///
    /// # Returns
    /// The pair (dL/d`centers` of shape (K, d), dL/d`widths` of shape (K,)).
    fn backward(
        &self,
        x: ArrayView2<f32>,
        centers: ArrayView2<f32>,
        widths: ArrayView1<f32>,
        upstream: ArrayView2<f32>,
    ) -> (Array2<f32>, Array1<f32>);
}
