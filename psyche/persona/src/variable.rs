use serde::{Deserialize, Serialize};

/// Named scalar that always stays inside `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    value: f32,
    min: f32,
    max: f32,
}

impl Variable {
    /// Creates a variable on the unit interval.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self::bounded(name, value, 0.0, 1.0)
    }

    /// Creates a variable with explicit bounds. Swapped bounds are reordered.
    #[must_use]
    pub fn bounded(name: impl Into<String>, value: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let mut variable = Self {
            name: name.into(),
            value: min,
            min,
            max,
        };
        variable.set(value);
        variable
    }

    /// Name of the variable.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Replaces the value, clamped. NaN leaves the value untouched.
    pub fn set(&mut self, value: f32) -> f32 {
        if !value.is_nan() {
            self.value = value.clamp(self.min, self.max);
        }
        self.value
    }

    /// Adds `delta`, clamped.
    pub fn add(&mut self, delta: f32) -> f32 {
        self.set(self.value + delta)
    }

    /// Subtracts `delta`, clamped.
    pub fn subtract(&mut self, delta: f32) -> f32 {
        self.set(self.value - delta)
    }

    /// Multiplies by `factor`, clamped.
    pub fn multiply(&mut self, factor: f32) -> f32 {
        self.set(self.value * factor)
    }

    /// Position of the value inside its range, in `[0, 1]`.
    #[must_use]
    pub fn normalized(&self) -> f32 {
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            return 0.0;
        }
        (self.value - self.min) / span
    }

    /// Whether the value sits on either bound.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        (self.value - self.min).abs() <= f32::EPSILON || (self.max - self.value).abs() <= f32::EPSILON
    }
}
