/// Exponentially weighted moving average over a stream of samples.
///
/// Each update moves the current value towards the new sample by `alpha`:
/// `value += alpha * (sample - value)`. The first sample seeds the average
/// directly. Non-finite samples (NaN, infinities) are ignored so a single
/// degenerate reading cannot poison every later value.
///
/// # Example
///
/// ```rust
/// use snarl::network::modules::stats::util::ewma::Ewma;
///
/// let mut ewma = Ewma::new(0.5);
/// ewma.update(10.0);
/// ewma.update(20.0);
/// assert_eq!(ewma.get(), Some(15.0));
/// ```
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    current_value: Option<f64>,
}

impl Ewma {
    /// Creates a new `Ewma` with smoothing factor `alpha`.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the range `(0, 1]`.
    pub fn new(alpha: f64) -> Self {
        assert!(
            alpha > 0.0 && alpha <= 1.0,
            "Alpha should be between 0 and 1"
        );
        Self {
            alpha,
            current_value: None,
        }
    }

    /// Folds `new_value` into the average and returns the updated value.
    ///
    /// A non-finite sample leaves the average unchanged; if no finite sample
    /// has been seen yet the return value is 0.0.
    pub fn update(&mut self, new_value: f64) -> f64 {
        if !new_value.is_finite() {
            return self.value_or(0.0);
        }

        let updated = match self.current_value {
            Some(current) => current + self.alpha * (new_value - current),
            None => new_value,
        };
        self.current_value = Some(updated);
        updated
    }

    /// Current average, or `None` before the first finite sample.
    pub fn get(&self) -> Option<f64> {
        self.current_value
    }

    /// Current average, or `default` before the first finite sample.
    pub fn value_or(&self, default: f64) -> f64 {
        self.current_value.unwrap_or(default)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Clears the average while keeping `alpha`.
    pub fn reset(&mut self) {
        self.current_value = None;
    }
}
