use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use super::Kernel;

/// Squared-exponential kernel, `Φ[n, k] = exp(−‖x_n − c_k‖² / (2 σ_k²))`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Gaussian;

impl Gaussian {
    /// Returns a new `Gaussian`.
    pub fn new() -> Self {
        Self
    }

    /// Pairwise squared distances between points and centers, shape (N, K).
    fn sq_distances(x: ArrayView2<f32>, centers: ArrayView2<f32>) -> Array2<f32> {
        let x_norms = x.map_axis(Axis(1), |row| row.dot(&row));
        let c_norms = centers.map_axis(Axis(1), |row| row.dot(&row));

        let mut q = x.dot(&centers.t());
        q.mapv_inplace(|v| -2.0 * v);
        q += &x_norms.insert_axis(Axis(1));
        q += &c_norms;

        // cancellation can leave tiny negatives
        q.mapv_inplace(|v| v.max(0.0));
        q
    }
}

impl Kernel for Gaussian {
    fn responses(
        &self,
        x: ArrayView2<f32>,
        centers: ArrayView2<f32>,
        widths: ArrayView1<f32>,
    ) -> Array2<f32> {
        let mut phi = Self::sq_distances(x, centers);
        let inv_two_sq = widths.mapv(|s| 1.0 / (2.0 * s * s));

        phi.zip_mut_with(&inv_two_sq, |q, &w| *q = -*q * w);
        phi.par_mapv_inplace(f32::exp);
        phi
    }

    fn backward(
        &self,
        x: ArrayView2<f32>,
        centers: ArrayView2<f32>,
        widths: ArrayView1<f32>,
        upstream: ArrayView2<f32>,
    ) -> (Array2<f32>, Array1<f32>) {
        let q = Self::sq_distances(x, centers);
        let inv_two_sq = widths.mapv(|s| 1.0 / (2.0 * s * s));

        // a = upstream ⊙ Φ
        let mut a = q.clone();
        a.zip_mut_with(&inv_two_sq, |v, &w| *v = -*v * w);
        a.par_mapv_inplace(f32::exp);
        a.zip_mut_with(&upstream, |v, &u| *v *= u);

        // dΦ/dc_k = Φ (x_n − c_k) / σ_k², summed over n against the upstream
        let col_sums = a.sum_axis(Axis(0));
        let mut grad_centers = a.t().dot(&x);
        Zip::from(grad_centers.rows_mut())
            .and(centers.rows())
            .and(&col_sums)
            .and(&widths)
            .for_each(|mut gc, ck, &s, &w| {
                let inv_sq = 1.0 / (w * w);
                Zip::from(&mut gc).and(ck).for_each(|g, &c| *g = (*g - s * c) * inv_sq);
            });

        // dΦ/dσ_k = Φ ‖x_n − c_k‖² / σ_k³
        let mut grad_widths = (&a * &q).sum_axis(Axis(0));
        Zip::from(&mut grad_widths)
            .and(&widths)
            .for_each(|g, &w| *g /= w * w * w);

        (grad_centers, grad_widths)
    }
}
