//! Integer exponential moving average.
//!
//! `smoothed = (factor × new + (1000 − factor) × previous) / 1000`
//!
//! `factor` is the weight of the new sample in thousandths: 1000 passes
//! samples through unchanged, small values smooth heavily.  The first
//! sample seeds the filter as-is.

/// Scale of the smoothing factor.
pub const FACTOR_SCALE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaFilter {
    factor: u16,
    previous_smoothed_mm: u16,
    initialized: bool,
}

impl EmaFilter {
    /// `factor` above 1000 is clamped to 1000.
    pub const fn new(factor: u16) -> Self {
        let factor = if factor as u32 > FACTOR_SCALE {
            FACTOR_SCALE as u16
        } else {
            factor
        };
        Self {
            factor,
            previous_smoothed_mm: 0,
            initialized: false,
        }
    }

    /// Blend `new_mm` into the filter and return the smoothed value.
    pub fn update(&mut self, new_mm: u16) -> u16 {
        if !self.initialized {
            self.previous_smoothed_mm = new_mm;
            self.initialized = true;
            return new_mm;
        }

        let f = u32::from(self.factor);
        let blended = (f * u32::from(new_mm)
            + (FACTOR_SCALE - f) * u32::from(self.previous_smoothed_mm))
            / FACTOR_SCALE;
        // Convex combination of two u16 values, so it fits.
        let smoothed = blended as u16;
        self.previous_smoothed_mm = smoothed;
        smoothed
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last smoothed value, `None` before the first sample.
    pub fn previous(&self) -> Option<u16> {
        self.initialized.then_some(self.previous_smoothed_mm)
    }

    pub fn factor(&self) -> u16 {
        self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_passes_through() {
        let mut f = EmaFilter::new(300);
        assert!(!f.is_initialized());
        assert_eq!(f.update(1234), 1234);
        assert_eq!(f.previous(), Some(1234));
    }

    #[test]
    fn blends_with_integer_truncation() {
        let mut f = EmaFilter::new(300);
        f.update(800);
        assert_eq!(f.update(820), 806);
        assert_eq!(f.update(810), 807);
    }

    #[test]
    fn factor_1000_disables_smoothing() {
        let mut f = EmaFilter::new(1000);
        f.update(100);
        assert_eq!(f.update(3000), 3000);
    }

    #[test]
    fn factor_0_freezes_at_seed() {
        let mut f = EmaFilter::new(0);
        f.update(500);
        assert_eq!(f.update(4000), 500);
        assert_eq!(f.update(20), 500);
    }

    #[test]
    fn oversized_factor_clamped() {
        assert_eq!(EmaFilter::new(5000).factor(), 1000);
    }
}
