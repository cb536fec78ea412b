use crate::types::{Point, Value};

/// Tolerance for treating two values or coordinates as equal.
pub const PRECISION: Value = 1e-4;

#[inline]
pub fn nearly_equal(a: Value, b: Value) -> bool {
    (a - b).abs() < PRECISION
}

// Return the interpolation factor t corresponding to iso_val
#[inline]
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    (iso_val - v0) / (v1 - v0)
}

// Linear interpolation
#[inline]
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

/// Point on the edge `p1`-`p2` where the linearly interpolated value equals `iso`.
///
/// Snaps to `p1` when `v1` is within [`PRECISION`] of `iso`, then to `p2` when `v2`
/// is, then to `p1` when the endpoint values coincide. A NaN coordinate in the
/// result (from NaN samples) is replaced by `0`.
pub fn interpolate_cross_point(iso: Value, p1: Point, p2: Point, v1: Value, v2: Value) -> Point {
    let p = if nearly_equal(iso, v1) {
        p1
    } else if nearly_equal(iso, v2) {
        p2
    } else if nearly_equal(v1, v2) {
        p1
    } else {
        let t = find_t(v1, v2, iso);
        Point::new(lerp(p1.x, p2.x, t), lerp(p1.y, p2.y, t), lerp(p1.z, p2.z, t))
    };

    p.map(|c| if c.is_nan() { 0. } else { c })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn edge() -> (Point, Point) {
        (Point::new(0., 0., 0.), Point::new(1., 2., 4.))
    }

    #[test]
    fn interpolates_linearly() {
        let (a, b) = edge();
        assert_relative_eq!(interpolate_cross_point(2., a, b, 1., 3.), Point::new(0.5, 1., 2.));
        assert_relative_eq!(interpolate_cross_point(2., a, b, 3., 1.), Point::new(0.5, 1., 2.));
        assert_relative_eq!(interpolate_cross_point(1., a, b, 0., 4.), Point::new(0.25, 0.5, 1.));
    }

    #[test]
    fn snaps_to_endpoints() {
        let (a, b) = edge();
        assert_eq!(interpolate_cross_point(2., a, b, 2.00001, 5.), a);
        assert_eq!(interpolate_cross_point(2., a, b, 5., 1.99999), b);
        assert_eq!(interpolate_cross_point(2., a, b, 7., 7.), a);
    }

    #[test]
    fn nan_samples_clamp_to_zero() {
        let (a, b) = (Point::new(5., 5., 5.), Point::new(6., 6., 6.));
        let p = interpolate_cross_point(2., a, b, Value::NAN, 1.);
        assert_eq!(p, Point::origin());
        assert!(p.iter().all(|c| c.is_finite()));
    }
}
