//! Membership degrees and piecewise-linear membership shapes

use serde::{Deserialize, Serialize};

/// A fuzzy truth value in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FuzzyValue(f64);

impl FuzzyValue {
    pub const ZERO: FuzzyValue = FuzzyValue(0.0);
    pub const ONE: FuzzyValue = FuzzyValue(1.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Fuzzy AND (t-norm) - minimum
    pub fn and(&self, other: &Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Fuzzy OR (t-conorm) - maximum
    pub fn or(&self, other: &Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Mamdani implication: clip `other` at this degree
    pub fn implies_mamdani(&self, other: &Self) -> Self {
        self.and(other)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl Default for FuzzyValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f64> for FuzzyValue {
    fn from(v: f64) -> Self {
        Self::new(v)
    }
}

/// Piecewise-linear membership function.
///
/// Points are ordered `a <= b <= c (<= d)`. A triangle is a trapezoid whose
/// plateau collapses to the single point `b`. Coincident outer points
/// (`a == b` or `c == d`) form a shoulder that keeps value 1 at the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MembershipShape {
    /// Triangular: (left, peak, right)
    Triangular { a: f64, b: f64, c: f64 },
    /// Trapezoidal: (left, left_top, right_top, right)
    Trapezoidal { a: f64, b: f64, c: f64, d: f64 },
}

impl MembershipShape {
    /// Triangular shape; points are sorted so the ordering invariant always holds.
    pub fn triangular(a: f64, b: f64, c: f64) -> Self {
        let [a, b, c] = sorted([a, b, c]);
        MembershipShape::Triangular { a, b, c }
    }

    /// Trapezoidal shape; points are sorted so the ordering invariant always holds.
    pub fn trapezoidal(a: f64, b: f64, c: f64, d: f64) -> Self {
        let [a, b, c, d] = sorted([a, b, c, d]);
        MembershipShape::Trapezoidal { a, b, c, d }
    }

    /// The four breakpoints, with a triangle's peak duplicated.
    fn points(&self) -> (f64, f64, f64, f64) {
        match *self {
            MembershipShape::Triangular { a, b, c } => (a, b, b, c),
            MembershipShape::Trapezoidal { a, b, c, d } => (a, b, c, d),
        }
    }

    /// Evaluate membership for a crisp value
    pub fn evaluate(&self, x: f64) -> FuzzyValue {
        let (a, b, c, d) = self.points();

        let result = if x.is_nan() {
            0.0
        } else if x >= b && x <= c {
            1.0
        } else if x <= a || x >= d {
            0.0
        } else if x < b {
            (x - a) / (b - a)
        } else {
            (d - x) / (d - c)
        };

        FuzzyValue::new(result)
    }

    /// Get the core (where membership = 1)
    pub fn core(&self) -> (f64, f64) {
        let (_, b, c, _) = self.points();
        (b, c)
    }

    /// Get the support bounds (membership > 0 strictly inside)
    pub fn support(&self) -> (f64, f64) {
        let (a, _, _, d) = self.points();
        (a, d)
    }
}

fn sorted<const N: usize>(mut points: [f64; N]) -> [f64; N] {
    points.sort_by(|x, y| x.total_cmp(y));
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fuzzy_value_operations() {
        let a = FuzzyValue::new(0.6);
        let b = FuzzyValue::new(0.4);

        assert!(close(a.and(&b).value(), 0.4));
        assert!(close(a.or(&b).value(), 0.6));
        assert!(close(a.implies_mamdani(&b).value(), 0.4));
        assert_eq!(FuzzyValue::new(1.7), FuzzyValue::ONE);
        assert_eq!(FuzzyValue::new(-0.2), FuzzyValue::ZERO);
        assert_eq!(FuzzyValue::new(f64::NAN), FuzzyValue::ZERO);
    }

    #[test]
    fn test_triangular_membership() {
        let mf = MembershipShape::triangular(0.0, 5.0, 10.0);

        assert!(close(mf.evaluate(0.0).value(), 0.0));
        assert!(close(mf.evaluate(5.0).value(), 1.0));
        assert!(close(mf.evaluate(10.0).value(), 0.0));
        assert!(close(mf.evaluate(2.5).value(), 0.5));
        assert!(close(mf.evaluate(7.5).value(), 0.5));
        assert!(close(mf.evaluate(-3.0).value(), 0.0));
        assert!(close(mf.evaluate(42.0).value(), 0.0));
    }

    #[test]
    fn test_trapezoidal_membership() {
        let mf = MembershipShape::trapezoidal(35.0, 40.0, 50.0, 50.0);

        assert!(close(mf.evaluate(35.0).value(), 0.0));
        assert!(close(mf.evaluate(37.5).value(), 0.5));
        assert!(close(mf.evaluate(40.0).value(), 1.0));
        assert!(close(mf.evaluate(45.0).value(), 1.0));
        assert!(close(mf.evaluate(50.0).value(), 1.0));
        assert!(close(mf.evaluate(51.0).value(), 0.0));
    }

    #[test]
    fn test_left_shoulder() {
        let very_cold = MembershipShape::trapezoidal(0.0, 0.0, 5.0, 10.0);
        assert!(close(very_cold.evaluate(0.0).value(), 1.0));
        assert!(close(very_cold.evaluate(7.5).value(), 0.5));
        assert!(close(very_cold.evaluate(10.0).value(), 0.0));

        let low = MembershipShape::triangular(0.0, 0.0, 40.0);
        assert!(close(low.evaluate(0.0).value(), 1.0));
        assert!(close(low.evaluate(20.0).value(), 0.5));
    }

    #[test]
    fn test_monotonic_segments_and_range() {
        let mf = MembershipShape::trapezoidal(10.0, 20.0, 30.0, 45.0);
        let mut previous = 0.0;
        for i in 0..=200 {
            let x = 10.0 + i as f64 * 0.05;
            let v = mf.evaluate(x).value();
            assert!((0.0..=1.0).contains(&v));
            assert!(v + 1e-12 >= previous, "rising edge must not decrease");
            previous = v;
        }
        let mut previous = 1.0;
        for i in 0..=300 {
            let x = 30.0 + i as f64 * 0.05;
            let v = mf.evaluate(x).value();
            assert!(v <= previous + 1e-12, "falling edge must not increase");
            previous = v;
        }
    }

    #[test]
    fn test_continuity_at_breakpoints() {
        let mf = MembershipShape::triangular(15.0, 25.0, 35.0);
        let eps = 1e-7;
        for x in [15.0, 25.0, 35.0] {
            let left = mf.evaluate(x - eps).value();
            let right = mf.evaluate(x + eps).value();
            assert!((left - right).abs() < 1e-5);
        }
    }

    #[test]
    fn test_points_are_sorted() {
        let mf = MembershipShape::triangular(20.0, 5.0, 10.0);
        assert_eq!(mf, MembershipShape::Triangular { a: 5.0, b: 10.0, c: 20.0 });
        assert_eq!(mf.core(), (10.0, 10.0));
        assert_eq!(mf.support(), (5.0, 20.0));
    }
}
