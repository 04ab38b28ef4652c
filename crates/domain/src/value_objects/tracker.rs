//! Tracker - circle-based combat resources (HP, stress, armor)
//!
//! A tracker stores its value twice: as `current` and as the number of
//! active entries in `circles`. Persisted records written by older sheets
//! may disagree, so `circles` is the source of truth whenever the key is
//! present, even when it is empty. `current`/`max` only rebuild the circles
//! for documents that never had them.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Upper bound on circles per tracker.
pub const MAX_CIRCLES: i32 = 32;

/// A single slot on a tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    #[serde(default)]
    pub active: bool,
}

impl Circle {
    pub fn active() -> Self {
        Self { active: true }
    }

    pub fn inactive() -> Self {
        Self { active: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TrackerDocument")]
pub struct Tracker {
    current: i32,
    max: i32,
    circles: Vec<Circle>,
}

/// Persisted tracker shape; `circles: None` means the key was absent or null.
#[derive(Deserialize)]
struct TrackerDocument {
    #[serde(default)]
    current: i32,
    #[serde(default)]
    max: i32,
    #[serde(default)]
    circles: Option<Vec<Circle>>,
}

impl TryFrom<TrackerDocument> for Tracker {
    type Error = DomainError;

    fn try_from(doc: TrackerDocument) -> Result<Self, Self::Error> {
        Self::from_parts(doc.current, doc.max, doc.circles)
    }
}

impl Tracker {
    /// A tracker with `max` inactive circles.
    pub fn empty(max: i32) -> Self {
        Self::rebuilt(0, max)
    }

    /// A tracker with `max` active circles.
    pub fn filled(max: i32) -> Self {
        Self::rebuilt(max, max)
    }

    /// Build from raw persisted parts.
    ///
    /// Present `circles` win over `current`/`max`; absent circles are rebuilt
    /// from the clamped counts. More than [`MAX_CIRCLES`] circles is rejected
    /// rather than truncated.
    pub fn from_parts(
        current: i32,
        max: i32,
        circles: Option<Vec<Circle>>,
    ) -> Result<Self, DomainError> {
        match circles {
            Some(circles) if circles.len() > MAX_CIRCLES as usize => {
                Err(DomainError::validation(format!(
                    "tracker has {} circles, at most {} allowed",
                    circles.len(),
                    MAX_CIRCLES
                )))
            }
            Some(circles) => {
                let mut tracker = Self {
                    current,
                    max,
                    circles,
                };
                tracker.reconcile();
                Ok(tracker)
            }
            None => Ok(Self::rebuilt(current, max)),
        }
    }

    fn rebuilt(current: i32, max: i32) -> Self {
        let max = max.clamp(0, MAX_CIRCLES);
        let current = current.clamp(0, max);
        Self {
            current,
            max,
            circles: (0..max).map(|i| Circle { active: i < current }).collect(),
        }
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Read accessors
    // ──────────────────────────────────────────────────────────────────────────

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Number of active circles.
    pub fn active_count(&self) -> i32 {
        self.circles.iter().filter(|c| c.active).count() as i32
    }

    pub fn is_consistent(&self) -> bool {
        self.circles.len() as i32 == self.max && self.active_count() == self.current
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Mutation
    // ──────────────────────────────────────────────────────────────────────────

    /// Restore `circles.len() == max` and `current == active circles`.
    ///
    /// Returns true if anything changed.
    pub fn reconcile(&mut self) -> bool {
        let max = self.circles.len() as i32;
        let current = self.active_count();
        let changed = self.max != max || self.current != current;
        self.max = max;
        self.current = current;
        changed
    }

    /// Resize the tracker, keeping the state of surviving circles.
    pub fn set_max(&mut self, max: i32) -> Result<(), DomainError> {
        if !(0..=MAX_CIRCLES).contains(&max) {
            return Err(DomainError::validation(format!(
                "tracker max {} outside 0..={}",
                max, MAX_CIRCLES
            )));
        }
        self.circles.resize(max as usize, Circle::inactive());
        self.max = max;
        self.current = self.active_count();
        Ok(())
    }

    /// Activate up to `count` inactive circles, lowest index first.
    ///
    /// Returns how many circles were actually activated.
    pub fn mark(&mut self, count: i32) -> i32 {
        let mut marked = 0;
        for circle in self.circles.iter_mut().filter(|c| !c.active) {
            if marked >= count {
                break;
            }
            circle.active = true;
            marked += 1;
        }
        self.current = self.active_count();
        marked
    }

    /// Deactivate up to `count` active circles, highest index first.
    pub fn clear(&mut self, count: i32) -> i32 {
        let mut cleared = 0;
        for circle in self.circles.iter_mut().rev().filter(|c| c.active) {
            if cleared >= count {
                break;
            }
            circle.active = false;
            cleared += 1;
        }
        self.current = self.active_count();
        cleared
    }

    /// Flip a single circle.
    pub fn toggle(&mut self, index: usize) -> Result<bool, DomainError> {
        let len = self.circles.len();
        let circle = self.circles.get_mut(index).ok_or_else(|| {
            DomainError::validation(format!("circle index {} out of range (len {})", index, len))
        })?;
        circle.active = !circle.active;
        let now_active = circle.active;
        self.current = self.active_count();
        Ok(now_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_tracker_is_all_active() {
        let hp = Tracker::filled(4);
        assert_eq!(hp.max(), 4);
        assert_eq!(hp.current(), 4);
        assert_eq!(hp.circles().len(), 4);
        assert!(hp.circles().iter().all(|c| c.active));
    }

    #[test]
    fn circles_win_over_stale_current() {
        let tracker = Tracker::from_parts(
            5,
            9,
            Some(vec![Circle::active(), Circle::inactive(), Circle::active()]),
        )
        .unwrap();
        assert_eq!(tracker.max(), 3);
        assert_eq!(tracker.current(), 2);
        assert!(tracker.is_consistent());
    }

    #[test]
    fn missing_circles_are_rebuilt_from_current() {
        let tracker = Tracker::from_parts(2, 5, None).unwrap();
        assert_eq!(tracker.circles().len(), 5);
        assert_eq!(tracker.active_count(), 2);
        assert!(tracker.circles()[0].active && tracker.circles()[1].active);
        assert!(!tracker.circles()[2].active);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let tracker = Tracker::from_parts(-3, 1000, None).unwrap();
        assert_eq!(tracker.max(), MAX_CIRCLES);
        assert_eq!(tracker.current(), 0);
    }

    #[test]
    fn reconcile_reports_changes() {
        let mut tracker = Tracker::filled(3);
        assert!(!tracker.reconcile());
    }

    #[test]
    fn empty_circles_are_trusted() {
        let tracker = Tracker::from_parts(4, 4, Some(Vec::new())).unwrap();
        assert_eq!(tracker.max(), 0);
        assert_eq!(tracker.current(), 0);
        assert!(tracker.circles().is_empty());
    }

    #[test]
    fn too_many_circles_are_rejected() {
        let circles = vec![Circle::active(); MAX_CIRCLES as usize + 1];
        assert!(Tracker::from_parts(0, 0, Some(circles)).is_err());

        let doc = serde_json::json!({"circles": vec![serde_json::json!({"active": false}); 40]});
        assert!(serde_json::from_value::<Tracker>(doc).is_err());
    }

    #[test]
    fn deserialize_distinguishes_absent_and_empty_circles() {
        let rebuilt: Tracker =
            serde_json::from_value(serde_json::json!({"current": 1, "max": 3})).unwrap();
        assert_eq!(rebuilt.circles().len(), 3);
        assert_eq!(rebuilt.current(), 1);

        let nulled: Tracker =
            serde_json::from_value(serde_json::json!({"current": 1, "max": 3, "circles": null}))
                .unwrap();
        assert_eq!(nulled, rebuilt);

        let emptied: Tracker =
            serde_json::from_value(serde_json::json!({"current": 1, "max": 3, "circles": []}))
                .unwrap();
        assert_eq!(emptied.max(), 0);
    }

    #[test]
    fn set_max_keeps_prefix() {
        let mut stress = Tracker::empty(6);
        stress.mark(2);
        stress.set_max(1).unwrap();
        assert_eq!(stress.circles(), &[Circle::active()]);
        assert_eq!(stress.current(), 1);

        stress.set_max(3).unwrap();
        assert_eq!(stress.current(), 1);
        assert_eq!(stress.circles().len(), 3);
        assert!(stress.set_max(-1).is_err());
    }

    #[test]
    fn mark_and_clear() {
        let mut armor = Tracker::empty(3);
        assert_eq!(armor.mark(5), 3);
        assert_eq!(armor.current(), 3);
        assert_eq!(armor.clear(1), 1);
        assert_eq!(armor.current(), 2);
        assert!(!armor.circles()[2].active);
    }

    #[test]
    fn toggle_checks_bounds() {
        let mut hp = Tracker::empty(2);
        assert!(hp.toggle(1).unwrap());
        assert_eq!(hp.current(), 1);
        assert!(hp.toggle(2).is_err());
    }
}
