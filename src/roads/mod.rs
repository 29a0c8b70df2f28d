pub mod classifier;
pub mod geometry;
pub mod query_filter;
pub mod rules;
pub mod tags;

pub use classifier::{AccessibilityClassifier, Classification};
pub use geometry::{LineStringGeometry, RawPoint};
pub use query_filter::{CandidateRoad, FilterOutcome, QueryFilter};
pub use rules::{AccessPolicy, AccessRule};
pub use tags::{RoadAttributes, TagSource, Tags};
