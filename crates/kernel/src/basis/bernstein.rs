//! Power-basis and Bernstein polynomial evaluation.

/// Evaluate `a[0] + a[1]*u + ... + a[n]*u^n` with Horner's rule.
pub fn horner(a: &[f64], u: f64) -> f64 {
    a.iter().rev().fold(0.0, |c, &ai| c * u + ai)
}

/// Value of the Bernstein polynomial `B(i, n)` at `u`.
///
/// Zero when `i > n`.
pub fn bernstein(i: usize, n: usize, u: f64) -> f64 {
    if i > n {
        return 0.0;
    }
    let mut temp = vec![0.0; n + 1];
    temp[n - i] = 1.0;
    let u1 = 1.0 - u;
    for k in 1..=n {
        for j in (k..=n).rev() {
            temp[j] = u1 * temp[j] + u * temp[j - 1];
        }
    }
    temp[n]
}

/// All `n + 1` Bernstein polynomials of degree `n` at `u`.
pub fn all_bernstein(n: usize, u: f64) -> Vec<f64> {
    let mut b = vec![0.0; n + 1];
    b[0] = 1.0;
    let u1 = 1.0 - u;
    for j in 1..=n {
        let mut saved = 0.0;
        for k in 0..j {
            let temp = b[k];
            b[k] = saved + u1 * temp;
            saved = u * temp;
        }
        b[j] = saved;
    }
    b
}
