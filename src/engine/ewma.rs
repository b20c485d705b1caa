// Exponentially weighted moving average

/// Default smoothing weight given to each new sample (1/8)
pub const DEFAULT_WEIGHT: f64 = 0.125;

/// EWMA over a noisy scalar measurement
///
/// The first sample seeds the average exactly; every later sample moves it
/// by `weight * (sample - average)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ewma {
    value: Option<f64>,
    weight: f64,
}

impl Ewma {
    /// Create an empty average; `weight` is clamped into (0, 1]
    pub fn new(weight: f64) -> Self {
        let weight = if weight.is_finite() && weight > 0.0 {
            weight.min(1.0)
        } else {
            DEFAULT_WEIGHT
        };
        Self { value: None, weight }
    }

    /// Feed a sample and return the smoothed value
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            None => sample,
            Some(prev) => self.weight * sample + (1.0 - self.weight) * prev,
        };
        self.value = Some(next);
        next
    }

    /// Smoothed value, `None` before the first sample
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Smoothed value, 0 before the first sample
    pub fn get(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl Default for Ewma {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHT)
    }
}
