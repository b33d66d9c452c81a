/// A span of real numbers, used for valid ray distances and box extents.
///
/// `min > max` is a legal value and means the span holds nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub const UNIVERSE: Interval = Interval {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    /// Endpoints count as inside.
    pub fn contains(&self, x: f64) -> bool {
        (self.min..=self.max).contains(&x)
    }

    /// Strict version of [`contains`](Self::contains); the hit tests use it
    /// so a root sitting exactly on `t_min` is rejected.
    pub fn surrounds(&self, x: f64) -> bool {
        self.min < x && x < self.max
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Grow by `delta` in total, split evenly between both ends.
    pub fn expand(&self, delta: f64) -> Interval {
        let half = 0.5 * delta;
        Interval::new(self.min - half, self.max + half)
    }

    /// Smallest interval covering both `a` and `b`.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNIVERSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_inclusive_vs_strict() {
        let ray_t = Interval::new(0.001, 4.0);
        assert!(ray_t.contains(0.001) && ray_t.contains(4.0));
        assert!(!ray_t.surrounds(0.001) && !ray_t.surrounds(4.0));
        assert!(ray_t.surrounds(2.0));
        assert!(!ray_t.contains(-1.0));
    }

    #[test]
    fn test_empty_and_default() {
        assert!(!Interval::EMPTY.contains(0.0));
        assert_eq!(Interval::default(), Interval::UNIVERSE);
        assert!(Interval::default().surrounds(-1e300));
    }

    #[test]
    fn test_expand_and_surrounding() {
        let padded = Interval::new(1.0, 1.0).expand(0.5);
        assert_eq!(padded, Interval::new(0.75, 1.25));
        assert_eq!(padded.size(), 0.5);

        assert_eq!(
            Interval::surrounding(&Interval::EMPTY, &padded),
            padded
        );
    }
}
