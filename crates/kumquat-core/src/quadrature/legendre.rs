//! Gauss-Legendre and Gauss-Kronrod node generation
//!
//! Gauss nodes are roots of the Legendre polynomial `P_n`, found by Newton
//! iteration. The Kronrod extension adds the `n + 1` roots of the Stieltjes
//! polynomial `E_{n+1}`, the monic-in-`P_{n+1}` polynomial orthogonal to every
//! polynomial of degree `<= n` under the weight `P_n`. Its coefficients in
//! the Legendre basis come from a small linear system; its roots interlace
//! the Gauss nodes, so each one is bracketed between two neighbours. Kronrod
//! weights are then fixed by requiring the rule to integrate `P_0..P_{2n}`
//! exactly.

use std::f64::consts::PI;

/// A Gauss-Kronrod rule on `[-1, 1]`
#[derive(Debug, Clone)]
pub(crate) struct KronrodNodes {
    /// All `2n + 1` nodes, ascending; Gauss nodes sit at odd indices
    pub nodes: Vec<f64>,
    /// Kronrod weights, aligned with `nodes`
    pub kronrod_weights: Vec<f64>,
    /// Gauss weights, aligned with `nodes`, zero at Kronrod-only nodes
    pub gauss_weights: Vec<f64>,
}

/// `(P_n(x), P_{n-1}(x))` by the three-term recurrence
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut previous = 1.0;
    let mut current = x;
    for k in 1..n {
        let k = k as f64;
        let next = ((2.0 * k + 1.0) * x * current - k * previous) / (k + 1.0);
        previous = current;
        current = next;
    }
    (current, previous)
}

/// `P_0(x) ..= P_m(x)`
fn legendre_table(m: usize, x: f64, out: &mut Vec<f64>) {
    out.clear();
    out.push(1.0);
    if m == 0 {
        return;
    }
    out.push(x);
    for k in 1..m {
        let kf = k as f64;
        let next = ((2.0 * kf + 1.0) * x * out[k] - kf * out[k - 1]) / (kf + 1.0);
        out.push(next);
    }
}

/// `P_n'(x)` for `|x| < 1`
fn legendre_derivative(n: usize, x: f64) -> f64 {
    let (p, q) = legendre_pair(n, x);
    n as f64 * (x * p - q) / (x * x - 1.0)
}

/// Gauss-Legendre nodes (ascending) and weights
pub(crate) fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let half = n / 2;
    let mut positive = Vec::with_capacity(half);
    for i in 0..half {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, _) = legendre_pair(n, x);
            let dx = p / legendre_derivative(n, x);
            x -= dx;
            if dx.abs() <= 4.0 * f64::EPSILON * x.abs() {
                break;
            }
        }
        positive.push(x);
    }
    positive.reverse();

    let mut nodes: Vec<f64> = positive.iter().rev().map(|x| -x).collect();
    if n % 2 == 1 {
        nodes.push(0.0);
    }
    nodes.extend(positive.iter().copied());

    let weights = nodes
        .iter()
        .map(|&x| {
            let dp = legendre_derivative(n, x);
            2.0 / ((1.0 - x * x) * dp * dp)
        })
        .collect();
    (nodes, weights)
}

/// Gaussian elimination with partial pivoting; `matrix` must be nonsingular
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Vec<f64> {
    let size = rhs.len();
    for col in 0..size {
        let pivot = (col..size)
            .max_by(|&i, &j| matrix[i][col].abs().total_cmp(&matrix[j][col].abs()))
            .unwrap_or(col);
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..size {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..size {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }
    solution
}

/// Root of `f` in `(lo, hi)`, given a sign change across the bracket
fn bisect(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = f(lo);
    loop {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            return mid;
        }
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if (f_mid < 0.0) == (f_lo < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
}

/// Coefficients of `E_{n+1} = P_{n+1} + sum c_k P_k` in the Legendre basis
///
/// Only terms of the same parity as `n + 1` are present; the returned
/// vector has length `n + 2` with zeros elsewhere.
fn stieltjes_coefficients(n: usize) -> Vec<f64> {
    let (qx, qw) = gauss_legendre(2 * n + 2);
    let mut table = Vec::with_capacity(n + 2);
    let tables: Vec<Vec<f64>> = qx
        .iter()
        .map(|&x| {
            legendre_table(n + 1, x, &mut table);
            table.clone()
        })
        .collect();

    let moment = |i: usize, j: usize, k: usize| -> f64 {
        tables
            .iter()
            .zip(&qw)
            .map(|(p, w)| w * p[i] * p[j] * p[k])
            .sum()
    };

    // The weight P_n makes every even-degree test polynomial vanish by parity.
    let tests: Vec<usize> = (0..=n).filter(|j| j % 2 == 1).collect();
    let unknowns: Vec<usize> = (0..n).filter(|k| (k + n + 1) % 2 == 0).collect();

    let matrix: Vec<Vec<f64>> = tests
        .iter()
        .map(|&j| unknowns.iter().map(|&k| moment(n, j, k)).collect())
        .collect();
    let rhs: Vec<f64> = tests.iter().map(|&j| -moment(n, j, n + 1)).collect();

    let solution = solve(matrix, rhs);
    let mut coefficients = vec![0.0; n + 2];
    coefficients[n + 1] = 1.0;
    for (&k, c) in unknowns.iter().zip(solution) {
        coefficients[k] = c;
    }
    coefficients
}

/// The `(2n + 1)`-point Kronrod extension of the `n`-point Gauss rule
pub(crate) fn kronrod(n: usize) -> KronrodNodes {
    let (gauss, _) = gauss_legendre(n);
    let coefficients = stieltjes_coefficients(n);
    let stieltjes = |x: f64| -> f64 {
        let mut table = Vec::with_capacity(n + 2);
        legendre_table(n + 1, x, &mut table);
        table.iter().zip(&coefficients).map(|(p, c)| p * c).sum()
    };

    let size = 2 * n + 1;
    let mut nodes = Vec::with_capacity(size);
    let mut lo = -1.0;
    for &g in &gauss {
        nodes.push(bisect(&stieltjes, lo, g));
        nodes.push(g);
        lo = g;
    }
    nodes.push(bisect(&stieltjes, lo, 1.0));

    // Enforce exact symmetry about the origin
    for i in 0..size / 2 {
        let x = 0.5 * (nodes[size - 1 - i] - nodes[i]);
        nodes[i] = -x;
        nodes[size - 1 - i] = x;
    }
    nodes[n] = 0.0;

    let mut table = Vec::with_capacity(size);
    let mut matrix = vec![vec![0.0; size]; size];
    for (i, &x) in nodes.iter().enumerate() {
        legendre_table(2 * n, x, &mut table);
        for (k, p) in table.iter().enumerate() {
            matrix[k][i] = p * ((2 * k + 1) as f64 / 2.0).sqrt();
        }
    }
    let mut rhs = vec![0.0; size];
    rhs[0] = 2.0 * 0.5_f64.sqrt();
    let mut kronrod_weights = solve(matrix, rhs);
    for i in 0..size / 2 {
        let w = 0.5 * (kronrod_weights[i] + kronrod_weights[size - 1 - i]);
        kronrod_weights[i] = w;
        kronrod_weights[size - 1 - i] = w;
    }

    let gauss_weights = nodes
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            if i % 2 == 1 {
                let dp = legendre_derivative(n, x);
                2.0 / ((1.0 - x * x) * dp * dp)
            } else {
                0.0
            }
        })
        .collect();

    KronrodNodes {
        nodes,
        kronrod_weights,
        gauss_weights,
    }
}
