use indexmap::IndexMap;

/// Emotion name to intensity in `[0, 1]`. Insertion order is preserved.
pub type EmotionMap = IndexMap<String, f32>;

/// Read helpers over an [`EmotionMap`].
pub trait EmotionMapExt {
    /// Highest intensity, `0.0` when empty.
    fn peak_intensity(&self) -> f32;
    /// Sum of all intensities.
    fn total_intensity(&self) -> f32;
    /// Strongest emotion; the first one wins ties.
    fn dominant_emotion(&self) -> Option<(&str, f32)>;
    /// Names of emotions strictly above `threshold`, in insertion order.
    fn active_emotions(&self, threshold: f32) -> Vec<String>;
    /// Mean intensity, `0.0` when empty.
    fn mean_intensity(&self) -> f32;
}

impl EmotionMapExt for EmotionMap {
    fn peak_intensity(&self) -> f32 {
        self.values().copied().fold(0.0, f32::max)
    }

    fn total_intensity(&self) -> f32 {
        self.values().copied().filter(|v| v.is_finite()).sum()
    }

    fn dominant_emotion(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (name, value) in self {
            match best {
                Some((_, current)) if *value <= current => {}
                _ => best = Some((name.as_str(), *value)),
            }
        }
        best
    }

    fn active_emotions(&self, threshold: f32) -> Vec<String> {
        self.iter()
            .filter(|(_, value)| **value > threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn mean_intensity(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let len = self.len() as f32;
        self.total_intensity() / len
    }
}

/// Blends `incoming` into `base`: `base·(1-weight) + incoming·weight`, clamped.
///
/// Emotions only present on one side are blended against zero.
#[must_use]
pub fn blend(base: &EmotionMap, incoming: &EmotionMap, weight: f32) -> EmotionMap {
    let weight = weight.clamp(0.0, 1.0);
    let mut merged = EmotionMap::new();
    for (name, value) in base {
        let other = incoming.get(name).copied().unwrap_or(0.0);
        merged.insert(name.clone(), other.mul_add(weight, value * (1.0 - weight)).clamp(0.0, 1.0));
    }
    for (name, value) in incoming {
        if !merged.contains_key(name) {
            merged.insert(name.clone(), (value * weight).clamp(0.0, 1.0));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EmotionMap {
        EmotionMap::from([
            ("joy".to_string(), 0.7),
            ("curiosity".to_string(), 0.7),
            ("fear".to_string(), 0.1),
        ])
    }

    #[test]
    fn dominant_prefers_first_on_ties() {
        let emotions = sample();
        assert_eq!(emotions.dominant_emotion(), Some(("joy", 0.7)));
        assert!((emotions.peak_intensity() - 0.7).abs() < f32::EPSILON);
        assert_eq!(emotions.active_emotions(0.3), vec!["joy", "curiosity"]);
    }

    #[test]
    fn empty_map_is_neutral() {
        let emotions = EmotionMap::new();
        assert!(emotions.dominant_emotion().is_none());
        assert!(emotions.mean_intensity().abs() < f32::EPSILON);
    }

    #[test]
    fn blend_mixes_both_sides() {
        let base = sample();
        let incoming = EmotionMap::from([("joy".to_string(), 0.1), ("awe".to_string(), 1.0)]);
        let merged = blend(&base, &incoming, 0.5);
        assert!((merged["joy"] - 0.4).abs() < 1e-6);
        assert!((merged["fear"] - 0.05).abs() < 1e-6);
        assert!((merged["awe"] - 0.5).abs() < 1e-6);
    }
}
