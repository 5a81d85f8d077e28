use ndarray::{Array1, Array2, ArrayView2, Axis, Zip, s};

use crate::{
    kernel::Kernel,
    params::{FieldGrad, FieldParams},
};

/// Evaluates the vector field at a batch of states:
///
/// `g(x) = ker(x, c, σ) · W − exp(−τ²) ⊙ x`
///
/// with the decay factor broadcast over rows. Pure in the kernel and the
/// parameters; this is both the public field query and the inner building
/// block of the training objective.
///
/// # Arguments
/// * `kernel` - The kernel capability.
/// * `x` - A batch of N state vectors, shape (N, d).
/// * `params` - The field parameters.
///
/// # Returns
/// The field values, shape (N, d).
pub fn vector_field<K: Kernel>(
    kernel: &K,
    x: ArrayView2<f32>,
    params: &FieldParams,
) -> Array2<f32> {
    let phi = kernel.responses(x, params.centers().view(), params.widths().view());
    let damping = params.decay().mapv(|t| (-(t * t)).exp());

    let mut g = phi.dot(params.weights());
    g -= &(&x * &damping);
    g
}

/// Computes the one-step-ahead prediction objective and its gradient with
/// respect to the parameters in one fused pass.
///
/// Over the T−1 transitions of the trajectory segment `x` the residuals are
/// `r = g(x[..T−1]) + x[..T−1] − x[1..]`. Without a mask the objective is
/// `mean(r²)`; with a mask `m` it is `sum(r² ⊙ m) / sum(m)`, so transitions
/// flagged invalid contribute neither to the loss nor to its normalization.
/// An all-zero mask divides by zero and the resulting NaN propagates.
///
/// The gradient is taken only with respect to `params`, never the data;
/// center and bandwidth terms flow through [`Kernel::backward`].
///
/// # Arguments
/// * `kernel` - The kernel capability.
/// * `x` - A trajectory segment, shape (T, d) with T ≥ 2.
/// * `params` - The field parameters.
/// * `mask` - Optional transition validity column, shape (T−1, 1).
///
/// # Panics
/// Panics if `x` has no rows or the mask cannot be broadcast against the
/// T−1 transitions.
pub fn objective_grad<K: Kernel>(
    kernel: &K,
    x: ArrayView2<f32>,
    params: &FieldParams,
    mask: Option<ArrayView2<f32>>,
) -> (f32, FieldGrad) {
    let t = x.nrows();
    let prev = x.slice(s![..t - 1, ..]);
    let next = x.slice(s![1.., ..]);

    let phi = kernel.responses(prev, params.centers().view(), params.widths().view());
    let damping = params.decay().mapv(|d| (-(d * d)).exp());

    let mut r = phi.dot(params.weights());
    r -= &(&prev * &damping);
    r += &prev;
    r -= &next;

    // per-entry loss weights: uniform mean, or mask / sum(mask)
    let scale = match mask {
        None => Array2::from_elem(r.dim(), 1.0 / r.len() as f32),
        Some(m) => {
            let total = m.sum();
            let mut scale = Array2::zeros(r.dim());
            scale.zip_mut_with(&m, |sv, &mv| *sv = mv / total);
            scale
        }
    };

    let value = Zip::from(&r)
        .and(&scale)
        .fold(0.0, |acc, &rv, &sv| acc + sv * rv * rv);

    // u = dL/dr
    let mut u = r;
    u.zip_mut_with(&scale, |rv, &sv| *rv *= 2.0 * sv);

    let grad_weights = phi.t().dot(&u);

    let upstream = u.dot(&params.weights().t());
    let (grad_centers, grad_widths) = kernel.backward(
        prev,
        params.centers().view(),
        params.widths().view(),
        upstream.view(),
    );

    // ∂r/∂τ_j = 2 τ_j exp(−τ_j²) x[..T−1, j]
    let col = (&u * &prev).sum_axis(Axis(0));
    let decay = params.decay();
    let grad_decay = if decay.len() == 1 {
        let d = decay[0];
        Array1::from_elem(1, 2.0 * d * (-(d * d)).exp() * col.sum())
    } else {
        Zip::from(&col)
            .and(decay)
            .map_collect(|&c, &d| 2.0 * d * (-(d * d)).exp() * c)
    };

    (
        value,
        FieldGrad {
            weights: grad_weights,
            decay: grad_decay,
            centers: grad_centers,
            widths: grad_widths,
        },
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::Gaussian;
    use ndarray::{ArrayView1, arr1, arr2};

    /// Responds with a constant one for every (point, center) pair.
    struct OnesKernel;

    impl Kernel for OnesKernel {
        fn responses(
            &self,
            x: ArrayView2<f32>,
            centers: ArrayView2<f32>,
            _widths: ArrayView1<f32>,
        ) -> Array2<f32> {
            Array2::ones((x.nrows(), centers.nrows()))
        }

        fn backward(
            &self,
            _x: ArrayView2<f32>,
            centers: ArrayView2<f32>,
            widths: ArrayView1<f32>,
            _upstream: ArrayView2<f32>,
        ) -> (Array2<f32>, Array1<f32>) {
            (Array2::zeros(centers.dim()), Array1::zeros(widths.len()))
        }
    }

    fn params() -> FieldParams {
        FieldParams::new(
            arr2(&[[0.2, -0.1], [0.3, 0.4], [-0.2, 0.1]]),
            arr1(&[0.7, 1.1]),
            arr2(&[[0.0, 0.0], [0.5, 0.5], [-0.5, 0.5]]),
            arr1(&[0.8, 1.0, 1.2]),
        )
        .unwrap()
    }

    fn trajectory() -> Array2<f32> {
        arr2(&[
            [0.1, 0.2],
            [0.5, -0.3],
            [0.9, 0.4],
            [-0.2, 0.8],
            [0.3, 0.1],
        ])
    }

    #[test]
    fn test_field_matches_hand_computation() {
        let params = params();
        let x = arr2(&[[1.0, -2.0], [0.0, 0.5]]);
        let g = vector_field(&OnesKernel, x.view(), &params);

        // with a ones kernel every row is the column sum of the weights
        let w_sums = [0.2 + 0.3 - 0.2, -0.1 + 0.4 + 0.1];
        let damping = [(-0.49f32).exp(), (-1.21f32).exp()];
        for i in 0..2 {
            for j in 0..2 {
                let expected = w_sums[j] - damping[j] * x[[i, j]];
                assert!((g[[i, j]] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_objective_is_non_negative() {
        let params = params();
        let x = trajectory();

        let (unmasked, _) = objective_grad(&Gaussian, x.view(), &params, None);
        assert!(unmasked >= 0.0);

        let mask = arr2(&[[1.0], [0.0], [1.0], [1.0]]);
        let (masked, _) = objective_grad(&Gaussian, x.view(), &params, Some(mask.view()));
        assert!(masked >= 0.0);
    }

    #[test]
    fn test_objective_is_zero_for_a_perfectly_predicted_path() {
        // huge decay kills the damping term, zero weights kill the basis
        // term, so g ≡ 0 and a constant path is predicted exactly
        let params = FieldParams::new(
            Array2::zeros((2, 2)),
            arr1(&[100.0]),
            arr2(&[[0.0, 0.0], [1.0, 1.0]]),
            arr1(&[1.0, 1.0]),
        )
        .unwrap();
        let x = arr2(&[[0.4, -0.6], [0.4, -0.6], [0.4, -0.6]]);

        let (value, _) = objective_grad(&Gaussian, x.view(), &params, None);
        assert!(value.abs() < 1e-10);
    }

    #[test]
    fn test_single_valid_transition_has_no_averaging_dilution() {
        let params = params();
        let x = trajectory();
        let mask = arr2(&[[1.0], [0.0], [0.0], [0.0]]);

        let (value, _) = objective_grad(&Gaussian, x.view(), &params, Some(mask.view()));

        let g = vector_field(&Gaussian, x.slice(s![..1, ..]), &params);
        let expected: f32 = (0..2)
            .map(|j| {
                let r = g[[0, j]] + x[[0, j]] - x[[1, j]];
                r * r
            })
            .sum();

        assert!((value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_all_zero_mask_yields_nan() {
        let params = params();
        let x = trajectory();
        let mask = Array2::zeros((4, 1));

        let (value, _) = objective_grad(&Gaussian, x.view(), &params, Some(mask.view()));
        assert!(value.is_nan());
    }

    fn check_against_finite_differences(mask: Option<Array2<f32>>, params: FieldParams) {
        let x = trajectory();
        let mask_view = mask.as_ref().map(|m| m.view());

        let (_, grad) = objective_grad(&Gaussian, x.view(), &params, mask_view);

        let h = 1e-2;
        let n = params.iter_scalars().count();
        for i in 0..n {
            let mut plus = params.clone();
            let mut minus = params.clone();
            if let Some(p) = plus.iter_scalars_mut().nth(i) {
                *p += h;
            }
            if let Some(p) = minus.iter_scalars_mut().nth(i) {
                *p -= h;
            }

            let (vp, _) = objective_grad(&Gaussian, x.view(), &plus, mask_view);
            let (vm, _) = objective_grad(&Gaussian, x.view(), &minus, mask_view);
            let numeric = (vp - vm) / (2.0 * h);

            let analytic = *grad.iter_scalars().nth(i).unwrap();
            assert!(
                (analytic - numeric).abs() < 1e-2 * (1.0 + numeric.abs()),
                "scalar {i}: analytic {analytic} vs numeric {numeric}",
            );
        }
    }

    #[test]
    fn test_gradient_matches_finite_differences_unmasked() {
        check_against_finite_differences(None, params());
    }

    #[test]
    fn test_gradient_matches_finite_differences_masked() {
        check_against_finite_differences(Some(arr2(&[[1.0], [0.0], [1.0], [1.0]])), params());
    }

    #[test]
    fn test_gradient_matches_finite_differences_with_scalar_decay() {
        let params = FieldParams::new(
            arr2(&[[0.2, -0.1], [0.3, 0.4], [-0.2, 0.1]]),
            arr1(&[0.9]),
            arr2(&[[0.0, 0.0], [0.5, 0.5], [-0.5, 0.5]]),
            arr1(&[0.8, 1.0, 1.2]),
        )
        .unwrap();
        check_against_finite_differences(None, params);
    }
}
