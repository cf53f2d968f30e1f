//! Small dense linear-algebra kernels over row-major `Vec<f64>` matrices.
//!
//! Dimensions here are tiny (a handful of features), so plain loops beat any
//! general-purpose matrix library.  Nothing in this module ever forms an explicit
//! inverse: quantities like `A^{-1} b` and `x^T A^{-1} x` go through a Cholesky
//! factorization of the symmetric positive-definite `A`.

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        s += x * y;
    }
    s
}

pub(crate) fn identity(dim: usize) -> Vec<f64> {
    let mut m = vec![0.0; dim * dim];
    for i in 0..dim {
        m[i * dim + i] = 1.0;
    }
    m
}

/// `A <- A + x x^T`.
pub(crate) fn add_outer(a: &mut [f64], dim: usize, x: &[f64]) {
    for i in 0..dim {
        let xi = x[i];
        if xi == 0.0 {
            continue;
        }
        let row = &mut a[i * dim..(i + 1) * dim];
        for (j, v) in row.iter_mut().enumerate() {
            *v += xi * x[j];
        }
    }
}

/// Lower-triangular Cholesky factor `L` with `A = L L^T`.
#[derive(Debug, Clone)]
pub(crate) struct Cholesky {
    l: Vec<f64>,
    dim: usize,
}

impl Cholesky {
    /// Factor `a` (`dim x dim`, row-major, symmetric).
    ///
    /// Returns `None` if `a` is not (numerically) positive definite.
    pub(crate) fn factor(a: &[f64], dim: usize) -> Option<Self> {
        if a.len() != dim * dim {
            return None;
        }
        let mut l = vec![0.0; dim * dim];
        for i in 0..dim {
            for j in 0..=i {
                let mut sum = a[i * dim + j];
                for k in 0..j {
                    sum -= l[i * dim + k] * l[j * dim + k];
                }
                if i == j {
                    if sum <= 0.0 || !sum.is_finite() {
                        return None;
                    }
                    l[i * dim + j] = sum.sqrt();
                } else {
                    let ljj = l[j * dim + j];
                    if ljj.abs() < 1e-12 {
                        return None;
                    }
                    l[i * dim + j] = sum / ljj;
                }
            }
        }
        Some(Self { l, dim })
    }

    /// Factor `a`, retrying once with `ridge * I` added if the plain factorization fails.
    pub(crate) fn factor_with_ridge(a: &[f64], dim: usize, ridge: f64) -> Option<Self> {
        if let Some(c) = Self::factor(a, dim) {
            return Some(c);
        }
        let mut reg = a.to_vec();
        for i in 0..dim {
            reg[i * dim + i] += ridge;
        }
        Self::factor(&reg, dim)
    }

    /// Solve `L y = b`.
    pub(crate) fn forward(&self, b: &[f64]) -> Vec<f64> {
        let n = self.dim;
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for j in 0..i {
                sum -= self.l[i * n + j] * y[j];
            }
            y[i] = sum / self.l[i * n + i];
        }
        y
    }

    /// Solve `L^T x = y`.
    pub(crate) fn backward(&self, y: &[f64]) -> Vec<f64> {
        let n = self.dim;
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.l[j * n + i] * x[j];
            }
            x[i] = sum / self.l[i * n + i];
        }
        x
    }

    /// `A^{-1} b`.
    pub(crate) fn solve(&self, b: &[f64]) -> Vec<f64> {
        self.backward(&self.forward(b))
    }

    /// `x^T A^{-1} x`, computed as `|L^{-1} x|^2` (never negative).
    pub(crate) fn inv_quad_form(&self, x: &[f64]) -> f64 {
        let y = self.forward(x);
        dot(&y, &y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cholesky_solves_known_system() {
        // A = [[4, 2], [2, 3]], b = [2, 1] => x = [0.5, 0.0]
        let a = vec![4.0, 2.0, 2.0, 3.0];
        let c = Cholesky::factor(&a, 2).unwrap();
        let x = c.solve(&[2.0, 1.0]);
        assert!((x[0] - 0.5).abs() < 1e-12, "{x:?}");
        assert!(x[1].abs() < 1e-12, "{x:?}");
    }

    #[test]
    fn quad_form_on_identity_is_squared_norm() {
        let a = identity(3);
        let c = Cholesky::factor(&a, 3).unwrap();
        let q = c.inv_quad_form(&[1.0, 2.0, 2.0]);
        assert!((q - 9.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_definite() {
        let a = vec![1.0, 2.0, 2.0, 1.0];
        assert!(Cholesky::factor(&a, 2).is_none());
        assert!(Cholesky::factor(&[0.0; 4], 2).is_none());
        // Ridge rescues the all-zero matrix.
        assert!(Cholesky::factor_with_ridge(&[0.0; 4], 2, 1e-9).is_some());
    }

    #[test]
    fn add_outer_keeps_symmetry() {
        let mut a = identity(3);
        add_outer(&mut a, 3, &[0.3, -1.0, 2.0]);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(a[i * 3 + j], a[j * 3 + i]);
            }
        }
        assert!((a[0] - 1.09).abs() < 1e-12);
        assert!((a[5] - -2.0).abs() < 1e-12);
    }
}
