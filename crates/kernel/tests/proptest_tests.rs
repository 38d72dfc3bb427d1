//! Property-based tests for the B-spline kernel using the `proptest` crate.

use proptest::prelude::*;

use nurbs_kernel::{basis_funs, find_span, BSplineCurve, Tolerance};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Clamped planar curve on `[0, 1]` of degree 1..=4 with up to five simple,
/// well separated interior knots.
fn arb_curve() -> impl Strategy<Value = BSplineCurve> {
    (1usize..=4, 0usize..=5).prop_flat_map(|(p, k)| {
        (
            prop::collection::vec(-10.0f64..10.0, 2 * (p + 1 + k)),
            prop::collection::vec(0.2f64..1.0, k + 1),
        )
            .prop_map(move |(coords, gaps)| {
                let total: f64 = gaps.iter().sum();
                let mut knots = vec![0.0; p + 1];
                let mut acc = 0.0;
                for g in &gaps[..k] {
                    acc += g;
                    knots.push(acc / total);
                }
                knots.extend(std::iter::repeat_n(1.0, p + 1));
                BSplineCurve::from_raw(2, coords, knots).unwrap()
            })
    })
}

/// Sorted knot values to insert, away from the domain ends.
fn arb_insertions() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..0.99, 1..4).prop_map(|mut v| {
        v.sort_by(f64::total_cmp);
        v.dedup();
        v
    })
}

fn sample_grid() -> Vec<f64> {
    (0..=32).map(|i| i as f64 / 32.0).collect()
}

const TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// 1. Partition of unity: the nonzero basis functions sum to one
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn basis_partition_of_unity(curve in arb_curve(), u in 0.0f64..=1.0) {
        let knots = curve.knots().as_slice();
        let n = curve.num_control_points() - 1;
        let span = find_span(knots, u, curve.degree(), n).unwrap();
        let basis = basis_funs(knots, u, curve.degree(), span).unwrap();
        let sum: f64 = basis.iter().sum();
        prop_assert!((sum - 1.0).abs() < TOL, "basis sum {} at u={}", sum, u);
        prop_assert!(basis.iter().all(|&b| b >= -TOL));
    }
}

// ---------------------------------------------------------------------------
// 2. Span correctness: every u in [U[i], U[i+1]) maps to span i
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn span_search_brackets_parameter(curve in arb_curve(), f in 0.0f64..1.0) {
        let knots = curve.knots().as_slice();
        let p = curve.degree();
        let n = curve.num_control_points() - 1;
        for i in p..=n {
            if knots[i] < knots[i + 1] {
                let u = knots[i] + f * (knots[i + 1] - knots[i]);
                if u < knots[i + 1] {
                    prop_assert_eq!(find_span(knots, u, p, n).unwrap(), i);
                }
            }
        }
        prop_assert_eq!(find_span(knots, knots[n + 1], p, n).unwrap(), n);
    }
}

// ---------------------------------------------------------------------------
// 3. Endpoint interpolation of clamped curves
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn clamped_curve_interpolates_ends(curve in arb_curve()) {
        let ends = curve.points_at(&[0.0, 1.0]).unwrap();
        let last = curve.num_control_points() - 1;
        for c in 0..2 {
            prop_assert!((ends.row(0)[c] - curve.points().row(0)[c]).abs() < TOL);
            prop_assert!((ends.row(1)[c] - curve.points().row(last)[c]).abs() < TOL);
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Knot refinement preserves shape
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn refinement_preserves_shape(curve in arb_curve(), x in arb_insertions()) {
        let refined = curve.refine(&x).unwrap();
        prop_assert_eq!(refined.num_control_points(), curve.num_control_points() + x.len());
        let grid = sample_grid();
        let dev = curve.points_at(&grid).unwrap().max_deviation(&refined.points_at(&grid).unwrap());
        prop_assert!(dev < 1e-8, "refinement moved the curve by {}", dev);
    }
}

// ---------------------------------------------------------------------------
// 5. Bezier decomposition reproduces the curve segment by segment
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn decomposition_preserves_shape(curve in arb_curve(), t in 0.0f64..=1.0) {
        let segments = curve.decompose().unwrap();
        prop_assert_eq!(segments.len(), curve.num_bezier_segments());
        prop_assert_eq!(segments.points().len(), segments.len() * curve.degree() + 1);
        for i in 0..segments.len() {
            let (a, b) = segments.interval(i);
            let local = segments.segment_curve(i).unwrap().point_at(t).unwrap();
            let global = curve.point_at(a + t * (b - a)).unwrap();
            for (x, y) in local.iter().zip(&global) {
                prop_assert!((x - y).abs() < 1e-8);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Degree elevation preserves points and derivatives
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn elevation_preserves_points_and_derivatives(curve in arb_curve(), t in 1usize..=2) {
        let elevated = curve.elevate_degree(t).unwrap();
        prop_assert_eq!(elevated.degree(), curve.degree() + t);
        prop_assert_eq!(
            elevated.num_control_points(),
            curve.num_control_points() + t * curve.num_bezier_segments()
        );
        let grid = sample_grid();
        let a = curve.derivs_at(1, &grid).unwrap();
        let b = elevated.derivs_at(1, &grid).unwrap();
        for k in 0..=1 {
            let dev = a.order_points(k).max_deviation(&b.order_points(k));
            prop_assert!(dev < 1e-6, "order {} deviates by {}", k, dev);
        }
    }
}

// ---------------------------------------------------------------------------
// 7. Reduction undoes elevation with a negligible error bound
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn reduction_inverts_elevation(curve in arb_curve()) {
        let reduced = curve.elevate_degree(1).unwrap().reduce_degree().unwrap();
        prop_assert_eq!(reduced.curve.degree(), curve.degree());
        prop_assert_eq!(reduced.curve.num_control_points(), curve.num_control_points());
        prop_assert!(reduced.max_error < 1e-6, "error bound {}", reduced.max_error);
        prop_assert!(reduced.curve.points().max_deviation(curve.points()) < 1e-6);
    }
}

// ---------------------------------------------------------------------------
// 8. An inserted knot can always be removed again
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn inserted_knot_is_removable(curve in arb_curve(), u in 0.01f64..0.99) {
        let refined = curve.refine(&[u]).unwrap();
        let removal = refined.remove_knot_value(u, Some(1), &Tolerance::default()).unwrap();
        prop_assert_eq!(removal.removed, 1);
        prop_assert_eq!(removal.curve.num_control_points(), curve.num_control_points());
        let grid = sample_grid();
        let before = curve.points_at(&grid).unwrap();
        let dev = removal.curve.points_at(&grid).unwrap().max_deviation(&before);
        prop_assert!(dev < 1e-6);
    }
}
