#![allow(clippy::cast_precision_loss)]

pub(crate) fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// Population variance.
pub(crate) fn variance(values: &[f32]) -> Option<f32> {
    let mean = mean(values)?;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32)
}

pub(crate) fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_variance() {
        assert!((variance(&[0.4, 0.6]).unwrap() - 0.01).abs() < 1e-6);
        assert!(variance(&[]).is_none());
        assert!((mean(&[1.0, 0.0, 0.5]).unwrap() - 0.5).abs() < 1e-6);
    }
}
