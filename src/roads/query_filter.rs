use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rules::AccessPolicy;
use super::tags::RoadAttributes;

/// Road submitted by a client for ad-hoc filtering.
///
/// Only `tags` is inspected; every other field is passed back untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateRoad {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterOutcome {
    pub total: usize,
    pub filtered: usize,
    pub roads: Vec<CandidateRoad>,
}

/// Re-filters road lists that did not come from the store.
///
/// Uses the screening policy (class, width, speed limit), which is broader than
/// the classification behind the stored flag. The two can disagree for the
/// same road.
#[derive(Clone, Debug)]
pub struct QueryFilter {
    policy: AccessPolicy,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::with_policy(AccessPolicy::screening())
    }

    pub fn with_policy(policy: AccessPolicy) -> Self {
        QueryFilter { policy }
    }

    pub fn permits(&self, road: &CandidateRoad) -> bool {
        let attributes = road
            .tags
            .as_ref()
            .map(RoadAttributes::from_tags)
            .unwrap_or_default();

        self.policy.permits(&attributes)
    }

    /// Keep the roads the policy permits
    ///
    /// # Returns
    /// Input count, kept count and the kept roads in input order
    pub fn filter(&self, roads: Vec<CandidateRoad>) -> FilterOutcome {
        let total = roads.len();
        let roads: Vec<CandidateRoad> = roads.into_iter().filter(|r| self.permits(r)).collect();

        FilterOutcome {
            total,
            filtered: roads.len(),
            roads,
        }
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::new()
    }
}
