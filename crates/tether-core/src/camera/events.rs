use rand::Rng;

/// Kinds of events a camera records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    MotionDetected,
    UserStartedViewing,
    BrightnessAdjusted,
}

impl CameraEvent {
    pub const ALL: [CameraEvent; 3] = [
        CameraEvent::MotionDetected,
        CameraEvent::UserStartedViewing,
        CameraEvent::BrightnessAdjusted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraEvent::MotionDetected => "motion detected",
            CameraEvent::UserStartedViewing => "user started viewing live video",
            CameraEvent::BrightnessAdjusted => "brightness adjusted",
        }
    }

    /// Pick an event uniformly at random.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Render a log description, filling in event details from `rng`.
    ///
    /// Motion carries coordinates in `[0, 100)`, brightness an adjustment in
    /// `[-10, 10]`.
    pub fn describe(&self, rng: &mut impl Rng) -> String {
        match self {
            CameraEvent::MotionDetected => {
                let x: u32 = rng.random_range(0..100);
                let y: u32 = rng.random_range(0..100);
                format!("{} at ({}, {})", self.as_str(), x, y)
            }
            CameraEvent::BrightnessAdjusted => {
                let adjustment: i32 = rng.random_range(-10..=10);
                format!("{} {}", self.as_str(), adjustment)
            }
            CameraEvent::UserStartedViewing => self.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for CameraEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_descriptions_follow_event_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let event = CameraEvent::random(&mut rng);
            let description = event.describe(&mut rng);
            assert!(description.starts_with(event.as_str()));

            match event {
                CameraEvent::MotionDetected => {
                    let coords = description
                        .trim_start_matches("motion detected at (")
                        .trim_end_matches(')');
                    for part in coords.split(", ") {
                        let value: u32 = part.parse().unwrap();
                        assert!(value < 100);
                    }
                }
                CameraEvent::BrightnessAdjusted => {
                    let value: i32 = description
                        .trim_start_matches("brightness adjusted ")
                        .parse()
                        .unwrap();
                    assert!((-10..=10).contains(&value));
                }
                CameraEvent::UserStartedViewing => {
                    assert_eq!(description, "user started viewing live video");
                }
            }
        }
    }

    #[test]
    fn test_random_covers_every_event() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(CameraEvent::random(&mut rng).as_str());
        }
        assert_eq!(seen.len(), CameraEvent::ALL.len());
    }
}
