// src/harvest/stability.rs

/// Decides when a lazily populated row list has stopped growing.
///
/// Each observation equal to the previous one extends a streak; any change
/// resets it. The list is considered loaded once the streak reaches
/// `threshold`. The very first observation has nothing to compare against and
/// never counts towards the streak.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    threshold: usize,
    previous: Option<usize>,
    streak: usize,
    observations: usize,
}

impl StabilityDetector {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            previous: None,
            streak: 0,
            observations: 0,
        }
    }

    /// Feed one row count; returns `true` once the list is stable.
    pub fn observe(&mut self, count: usize) -> bool {
        self.observations += 1;
        match self.previous {
            Some(prev) if prev == count => self.streak += 1,
            _ => self.streak = 0,
        }
        self.previous = Some(count);
        self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        self.streak >= self.threshold
    }

    pub fn last_count(&self) -> Option<usize> {
        self.previous
    }

    pub fn observations(&self) -> usize {
        self.observations
    }
}
