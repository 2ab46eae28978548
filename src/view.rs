//! Real-valued intervals for visible time windows and value extents.

/// Closed interval `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Range {
    /// Build an interval; reversed bounds are put in order.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Distance between the bounds.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Midpoint of the interval.
    pub fn center(&self) -> f64 {
        self.min + self.span() * 0.5
    }

    /// Both bounds are finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Finite with a strictly positive span. Visible time ranges must satisfy
    /// this before a window is computed for them.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.span() > 0.0
    }

    /// Grow to cover `value`. Gaps and infinities are skipped.
    pub fn expand_to_include(&mut self, value: f64) {
        if value.is_finite() {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    /// Translate both bounds by `delta`.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Widen on both sides by `frac` of the span, never by less than
    /// `min_padding`.
    pub fn padded(&self, frac: f64, min_padding: f64) -> Self {
        let pad = (self.span().abs() * frac).max(min_padding);
        self.widened(pad)
    }

    /// Grow symmetrically around the center until the span reaches
    /// `min_span`. Wider ranges are returned unchanged.
    pub fn with_min_span(&self, min_span: f64) -> Self {
        if self.span() >= min_span {
            return *self;
        }
        let center = self.center();
        Range {
            min: center - min_span * 0.5,
            max: center + min_span * 0.5,
        }
    }

    fn widened(&self, pad: f64) -> Self {
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }
}

/// Time range on `x`, value range on `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Time range.
    pub x: Range,
    /// Value range.
    pub y: Range,
}

impl Viewport {
    /// Pair a time range with a value range.
    pub fn new(x: Range, y: Range) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_span_grows_around_center() {
        let grown = Range::new(2.0, 2.0).with_min_span(1.0);
        assert_eq!(grown, Range::new(1.5, 2.5));
        assert!(!Range::new(2.0, 2.0).is_valid());
        assert!(grown.is_valid());
    }

    #[test]
    fn reversed_bounds_are_ordered() {
        let range = Range::new(5.0, -1.0);
        assert_eq!((range.min, range.max), (-1.0, 5.0));
        assert_eq!(range.shifted(1.0), Range::new(0.0, 6.0));
    }

    #[test]
    fn gaps_do_not_expand() {
        let mut range = Range::new(0.0, 1.0);
        range.expand_to_include(f64::NAN);
        range.expand_to_include(f64::INFINITY);
        range.expand_to_include(3.0);
        assert_eq!(range, Range::new(0.0, 3.0));
    }

    #[test]
    fn padding_has_a_floor() {
        let flat = Range::new(4.0, 4.0).padded(0.1, 0.5);
        assert_eq!(flat, Range::new(3.5, 4.5));
        let wide = Range::new(0.0, 10.0).padded(0.1, 0.5);
        assert_eq!(wide, Range::new(-1.0, 11.0));
    }
}
