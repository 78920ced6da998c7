//! Banded complex matrices and their LU factorization.
//!
//! Finite-difference operators on a grid ordered with y fastest only couple
//! unknowns a bounded index distance apart, so they are stored as bands.
//!
//! # Storage
//!
//! Row `r` keeps columns `r - kl ..= r + kl + ku` contiguously. The extra `kl`
//! columns on the right hold the fill-in produced by partial pivoting, the
//! same layout LAPACK's `gbtrf` uses (transposed to rows).

use num_complex::Complex64;

#[derive(Debug, Clone)]
pub struct BandMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    data: Vec<Complex64>,
}

impl BandMatrix {
    /// Zero `n x n` matrix with `kl` sub- and `ku` super-diagonals.
    pub fn zeros(n: usize, kl: usize, ku: usize) -> Self {
        let width = 2 * kl + ku + 1;
        Self {
            n,
            kl,
            ku,
            data: vec![Complex64::default(); n * width],
        }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn lower_bandwidth(&self) -> usize {
        self.kl
    }

    pub fn upper_bandwidth(&self) -> usize {
        self.ku
    }

    #[inline]
    fn width(&self) -> usize {
        2 * self.kl + self.ku + 1
    }

    #[inline]
    fn slot(&self, r: usize, c: usize) -> usize {
        r * self.width() + (c + self.kl - r)
    }

    /// Whether `(r, c)` lies inside the declared band.
    #[inline]
    pub fn in_band(&self, r: usize, c: usize) -> bool {
        r < self.n && c < self.n && c + self.kl >= r && c <= r + self.ku
    }

    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        if self.in_band(r, c) {
            self.data[self.slot(r, c)]
        } else {
            Complex64::default()
        }
    }

    /// Accumulates `value` into `(r, c)`.
    ///
    /// # Panics
    /// If `(r, c)` lies outside the band; that is an assembly bug.
    pub fn add(&mut self, r: usize, c: usize, value: Complex64) {
        assert!(
            self.in_band(r, c),
            "entry ({r}, {c}) outside band (kl={}, ku={})",
            self.kl,
            self.ku
        );
        let s = self.slot(r, c);
        self.data[s] += value;
    }

    pub fn add_real(&mut self, r: usize, c: usize, value: f64) {
        self.add(r, c, Complex64::new(value, 0.0));
    }

    /// `A - shift·I`.
    pub fn shifted(&self, shift: Complex64) -> Self {
        let mut out = self.clone();
        for i in 0..self.n {
            let s = out.slot(i, i);
            out.data[s] -= shift;
        }
        out
    }

    /// `y = A x`.
    pub fn mul_vec(&self, x: &[Complex64]) -> Vec<Complex64> {
        assert_eq!(x.len(), self.n, "vector length must match matrix dimension");
        let mut y = vec![Complex64::default(); self.n];
        for (r, yr) in y.iter_mut().enumerate() {
            let lo = r.saturating_sub(self.kl);
            let hi = (r + self.ku).min(self.n - 1);
            let mut acc = Complex64::default();
            for c in lo..=hi {
                acc += self.data[self.slot(r, c)] * x[c];
            }
            *yr = acc;
        }
        y
    }

    /// LU factorization with partial pivoting. Consumes the matrix.
    pub fn factor(mut self) -> Result<BandLu, SingularPivot> {
        let n = self.n;
        let kl = self.kl;
        let ku = self.ku;
        let mut pivots = Vec::with_capacity(n);

        for k in 0..n {
            let last_row = (k + kl).min(n - 1);
            let last_col = (k + kl + ku).min(n - 1);

            let mut p = k;
            let mut best = self.data[self.slot(k, k)].norm();
            for r in k + 1..=last_row {
                let v = self.data[self.slot(r, k)].norm();
                if v > best {
                    best = v;
                    p = r;
                }
            }
            if best == 0.0 || !best.is_finite() {
                return Err(SingularPivot { row: k });
            }
            pivots.push(p);

            if p != k {
                for c in k..=last_col {
                    let a = self.slot(k, c);
                    let b = self.slot(p, c);
                    self.data.swap(a, b);
                }
            }

            let pivot = self.data[self.slot(k, k)];
            for r in k + 1..=last_row {
                let s = self.slot(r, k);
                let l = self.data[s] / pivot;
                self.data[s] = l;
                if l == Complex64::default() {
                    continue;
                }
                for c in k + 1..=last_col {
                    let u = self.data[self.slot(k, c)];
                    let t = self.slot(r, c);
                    self.data[t] -= l * u;
                }
            }
        }

        Ok(BandLu {
            factors: self,
            pivots,
        })
    }
}

/// A zero pivot was met while factoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularPivot {
    pub row: usize,
}

/// Factors `P·A = L·U` of a [`BandMatrix`].
#[derive(Debug, Clone)]
pub struct BandLu {
    factors: BandMatrix,
    pivots: Vec<usize>,
}

impl BandLu {
    pub fn dim(&self) -> usize {
        self.factors.n
    }

    /// Overwrites `b` with `A⁻¹ b`.
    pub fn solve_in_place(&self, b: &mut [Complex64]) {
        let a = &self.factors;
        let n = a.n;
        assert_eq!(b.len(), n, "right-hand side length must match matrix dimension");

        for k in 0..n {
            let p = self.pivots[k];
            if p != k {
                b.swap(k, p);
            }
            let bk = b[k];
            if bk == Complex64::default() {
                continue;
            }
            for r in k + 1..=(k + a.kl).min(n - 1) {
                b[r] -= a.data[a.slot(r, k)] * bk;
            }
        }

        for k in (0..n).rev() {
            let mut acc = b[k];
            for c in k + 1..=(k + a.kl + a.ku).min(n - 1) {
                acc -= a.data[a.slot(k, c)] * b[c];
            }
            b[k] = acc / a.data[a.slot(k, k)];
        }
    }

    pub fn solve(&self, b: &[Complex64]) -> Vec<Complex64> {
        let mut x = b.to_vec();
        self.solve_in_place(&mut x);
        x
    }
}
