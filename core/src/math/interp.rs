/// Linear interpolation of `(t, value)` pairs sorted by strictly increasing `t`.
pub struct LinearInterpolator<'a> {
    knots: &'a [(i64, f64)],
}

impl<'a> LinearInterpolator<'a> {
    pub fn new(knots: &'a [(i64, f64)]) -> Self {
        Self { knots }
    }

    /// First and last knot times, when any exist.
    pub fn span(&self) -> Option<(i64, i64)> {
        Some((self.knots.first()?.0, self.knots.last()?.0))
    }

    /// Value at `t`; `None` outside the knot span (no extrapolation).
    pub fn at(&self, t: i64) -> Option<f64> {
        let (first, last) = self.span()?;
        if t < first || t > last {
            return None;
        }
        let upper = self.knots.partition_point(|&(knot, _)| knot < t);
        let (t1, v1) = self.knots[upper];
        if t1 == t || upper == 0 {
            return Some(v1);
        }
        let (t0, v0) = self.knots[upper - 1];
        let fraction = (t - t0) as f64 / (t1 - t0) as f64;
        Some(v0 + (v1 - v0) * fraction)
    }
}
