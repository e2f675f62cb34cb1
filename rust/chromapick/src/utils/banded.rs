use crate::errors::NumericalError;

/// Symmetric matrix with two non-zero bands on each side of the diagonal.
///
/// Stored by bands: `diag[i] = A[i][i]`, `off1[i] = A[i][i+1]` and
/// `off2[i] = A[i][i+2]`. This is the shape of `W + lambda * D'D` when `D`
/// is the second-difference operator.
#[derive(Debug, Clone)]
pub struct SymmetricPentadiagonal {
    diag: Vec<f64>,
    off1: Vec<f64>,
    off2: Vec<f64>,
}

impl SymmetricPentadiagonal {
    pub fn zeros(n: usize) -> Self {
        Self {
            diag: vec![0.0; n],
            off1: vec![0.0; n.saturating_sub(1)],
            off2: vec![0.0; n.saturating_sub(2)],
        }
    }

    /// `lambda * D'D` for the `(n - 2) x n` second-difference operator.
    pub fn second_difference_penalty(n: usize, lambda: f64) -> Self {
        let mut out = Self::zeros(n);
        if n < 3 {
            return out;
        }
        const COEFS: [f64; 3] = [1.0, -2.0, 1.0];
        for k in 0..(n - 2) {
            for a in 0..3 {
                for b in a..3 {
                    let v = lambda * COEFS[a] * COEFS[b];
                    match b - a {
                        0 => out.diag[k + a] += v,
                        1 => out.off1[k + a] += v,
                        _ => out.off2[k + a] += v,
                    }
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    /// Copy of the matrix with `extra` added to the diagonal.
    pub fn with_added_diagonal(&self, extra: &[f64]) -> Self {
        let mut out = self.clone();
        for (d, e) in out.diag.iter_mut().zip(extra.iter()) {
            *d += e;
        }
        out
    }

    /// Solves `A x = rhs` with a banded Cholesky factorization.
    ///
    /// Fails with [`NumericalError::SingularSystem`] when a pivot is not
    /// strictly positive, i.e. the matrix is singular or not positive definite.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, NumericalError> {
        let n = self.len();
        assert_eq!(rhs.len(), n, "Right hand side must match the matrix size");

        // L has bands l0 (diagonal), l1 (sub-diagonal) and l2.
        let mut l0 = vec![0.0; n];
        let mut l1 = vec![0.0; n];
        let mut l2 = vec![0.0; n];
        for i in 0..n {
            if i >= 2 {
                l2[i] = self.off2[i - 2] / l0[i - 2];
            }
            if i >= 1 {
                let mut acc = self.off1[i - 1];
                if i >= 2 {
                    acc -= l2[i] * l1[i - 1];
                }
                l1[i] = acc / l0[i - 1];
            }
            let pivot = self.diag[i] - l1[i] * l1[i] - l2[i] * l2[i];
            if !(pivot > 0.0) || !pivot.is_finite() {
                return Err(NumericalError::SingularSystem {
                    row: i,
                    pivot,
                    context: "banded cholesky".to_string(),
                });
            }
            l0[i] = pivot.sqrt();
        }

        // L y = rhs
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut acc = rhs[i];
            if i >= 1 {
                acc -= l1[i] * y[i - 1];
            }
            if i >= 2 {
                acc -= l2[i] * y[i - 2];
            }
            y[i] = acc / l0[i];
        }

        // L' x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut acc = y[i];
            if i + 1 < n {
                acc -= l1[i + 1] * x[i + 1];
            }
            if i + 2 < n {
                acc -= l2[i + 2] * x[i + 2];
            }
            x[i] = acc / l0[i];
        }
        Ok(x)
    }

    #[cfg(test)]
    fn mul(&self, x: &[f64]) -> Vec<f64> {
        let n = self.len();
        let mut out = vec![0.0; n];
        for i in 0..n {
            out[i] += self.diag[i] * x[i];
            if i + 1 < n {
                out[i] += self.off1[i] * x[i + 1];
                out[i + 1] += self.off1[i] * x[i];
            }
            if i + 2 < n {
                out[i] += self.off2[i] * x[i + 2];
                out[i + 2] += self.off2[i] * x[i];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_bands() {
        // D'D for n = 5 (rows of D are [1, -2, 1]).
        let p = SymmetricPentadiagonal::second_difference_penalty(5, 1.0);
        assert_eq!(p.diag, vec![1.0, 5.0, 6.0, 5.0, 1.0]);
        assert_eq!(p.off1, vec![-2.0, -4.0, -4.0, -2.0]);
        assert_eq!(p.off2, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_solve_round_trip() {
        let n = 12;
        let w: Vec<f64> = (0..n).map(|i| 0.5 + (i % 3) as f64).collect();
        let a = SymmetricPentadiagonal::second_difference_penalty(n, 10.0).with_added_diagonal(&w);
        let expected: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin()).collect();
        let rhs = a.mul(&expected);
        let got = a.solve(&rhs).unwrap();
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-9, "Expected {:?}, got {:?}", expected, got);
        }
    }

    #[test]
    fn test_singular_penalty_is_reported() {
        // The bare penalty has linear functions in its null space.
        let a = SymmetricPentadiagonal::second_difference_penalty(6, 1.0);
        let out = a.solve(&[1.0; 6]);
        assert!(matches!(out, Err(NumericalError::SingularSystem { .. })));
    }
}
