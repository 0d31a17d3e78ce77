//! Fixed-order Gauss-Legendre quadrature.

/// Nodes and weights on `[-1, 1]`.
#[derive(Debug, Clone)]
pub(crate) struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Build the rule of the given order.
    ///
    /// Roots of the Legendre polynomial are refined by Newton's method from
    /// the Tricomi initial guess; only the non-negative half is computed and
    /// mirrored.
    pub(crate) fn new(order: usize) -> Self {
        assert!(order > 0, "quadrature order must be positive");
        let n = order as f64;
        let half = (order + 1) / 2;

        let mut nodes = vec![0.; order];
        let mut weights = vec![0.; order];

        for i in 0..half {
            let mut x = f64::cos(std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5));
            let mut derivative = 0.;
            for _ in 0..100 {
                let (p, dp) = legendre(order, x);
                derivative = dp;
                let dx = p / dp;
                x -= dx;
                if dx.abs() <= 1e-15 {
                    derivative = legendre(order, x).1;
                    break;
                }
            }
            let w = 2. / ((1. - x * x) * derivative * derivative);

            nodes[i] = -x;
            weights[i] = w;
            nodes[order - 1 - i] = x;
            weights[order - 1 - i] = w;
        }

        Self { nodes, weights }
    }

    /// Iterate over `(node, weight)` pairs mapped onto `[a, b]`.
    pub(crate) fn on(&self, a: f64, b: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        let mid = 0.5 * (a + b);
        let half = 0.5 * (b - a);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(move |(&x, &w)| (mid + half * x, half * w))
    }
}

/// `P_n(x)` and its derivative from the three-term recurrence.
fn legendre(order: usize, x: f64) -> (f64, f64) {
    let (mut p0, mut p1) = (1., 0.);
    for j in 1..=order {
        let j = j as f64;
        let p2 = p1;
        p1 = p0;
        p0 = ((2. * j - 1.) * x * p1 - (j - 1.) * p2) / j;
    }
    let dp = order as f64 * (x * p0 - p1) / (x * x - 1.);
    (p0, dp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_interval_length() {
        for order in [1, 2, 5, 16, 32, 48] {
            let rule = GaussLegendre::new(order);
            let total: f64 = rule.on(0., 3.).map(|(_, w)| w).sum();
            assert_abs_diff_eq!(total, 3., epsilon = 1e-12);
        }
    }

    #[test]
    fn exact_for_polynomials() {
        // An n-point rule integrates degree 2n - 1 exactly
        let rule = GaussLegendre::new(4);
        let integral: f64 = rule.on(-1., 2.).map(|(x, w)| w * x.powi(7)).sum();
        assert_abs_diff_eq!(integral, (2f64.powi(8) - 1.) / 8., epsilon = 1e-11);
    }

    #[test]
    fn known_nodes() {
        let rule = GaussLegendre::new(2);
        let nodes: Vec<_> = rule.on(-1., 1.).map(|(x, _)| x).collect();
        assert_abs_diff_eq!(nodes[0], -1. / 3f64.sqrt(), epsilon = 1e-15);
        assert_abs_diff_eq!(nodes[1], 1. / 3f64.sqrt(), epsilon = 1e-15);

        // Odd orders include the midpoint
        let rule = GaussLegendre::new(3);
        let (mid, w) = rule.on(-1., 1.).nth(1).unwrap();
        assert_abs_diff_eq!(mid, 0., epsilon = 1e-15);
        assert_abs_diff_eq!(w, 8. / 9., epsilon = 1e-14);
    }

    #[test]
    fn smooth_integrand() {
        let rule = GaussLegendre::new(32);
        let integral: f64 = rule
            .on(0., std::f64::consts::PI)
            .map(|(x, w)| w * x.sin())
            .sum();
        assert_abs_diff_eq!(integral, 2., epsilon = 1e-13);
    }
}
