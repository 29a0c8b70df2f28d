use super::rules::{AccessPolicy, AccessRule};
use super::tags::{RoadAttributes, TagSource};

/// Result of classifying one way at ingestion time
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub is_accessible: bool,
    pub width_m: Option<f64>,
    pub max_speed_kph: Option<u32>,
}

/// Decides the persisted `is_accessible` flag.
///
/// Only road class, access and oneway tags feed the flag. Width and speed limit
/// are derived alongside it but never change it; screening on those happens in
/// [`super::QueryFilter`].
#[derive(Clone, Debug)]
pub struct AccessibilityClassifier {
    policy: AccessPolicy,
}

impl AccessibilityClassifier {
    pub fn new() -> Self {
        AccessibilityClassifier {
            policy: AccessPolicy::classification(),
        }
    }

    /// Flag and derived attributes for one tag map
    ///
    /// # Arguments
    /// * `tags` - OSM tags of the way (Overpass map or client JSON)
    pub fn classify<T: TagSource + ?Sized>(&self, tags: &T) -> Classification {
        let road = RoadAttributes::from_tags(tags);

        Classification {
            is_accessible: self.is_accessible(&road),
            width_m: road.width_m,
            max_speed_kph: road.max_speed_kph,
        }
    }

    pub fn is_accessible(&self, road: &RoadAttributes) -> bool {
        self.policy.permits(road)
    }

    /// Rule that made the road inaccessible, if any
    pub fn rejection(&self, road: &RoadAttributes) -> Option<&AccessRule> {
        self.policy.first_rejection(road)
    }
}

impl Default for AccessibilityClassifier {
    fn default() -> Self {
        Self::new()
    }
}
