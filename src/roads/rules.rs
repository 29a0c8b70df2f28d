//! Named access rules and the policies built from them.
//!
//! Two policies exist and they intentionally disagree:
//! - [`AccessPolicy::classification`] decides the `is_accessible` flag that is
//!   persisted at ingestion. It only looks at road class and access tags.
//! - [`AccessPolicy::screening`] re-filters ad-hoc road lists submitted by
//!   clients and also screens on width and speed limit.
//!
//! A road stored as accessible may still be dropped by screening, so callers
//! must not treat the two as interchangeable.

use std::fmt::{Display, Formatter};

use super::tags::RoadAttributes;

/// Limited-access road classes, never usable by small vehicles
pub const EXCLUDED_HIGHWAY_TYPES: [&str; 4] = ["motorway", "trunk", "motorway_link", "trunk_link"];

/// `access` values that close a road to the public
pub const RESTRICTED_ACCESS_VALUES: [&str; 2] = ["private", "no"];

pub const MIN_WIDTH_M: f64 = 2.5;
pub const MAX_SPEED_LIMIT_KPH: u32 = 90;

/// Assumed speed limit when the `maxspeed` tag is missing or unparseable
pub const DEFAULT_SPEED_KPH: u32 = 50;

#[derive(Clone, Debug, PartialEq)]
pub enum AccessRule {
    /// Rejects motorway/trunk classes and their links.
    ExcludedHighway,
    /// Rejects `access=private` and `access=no`.
    RestrictedAccess,
    /// One-way for cars with `oneway:bicycle` not set to `no`.
    ///
    /// Kept as an explicit rule so the check stays visible, but a one-way
    /// restriction alone never excludes a road: this rule never rejects.
    OnewayBicycleOverride,
    /// Rejects roads narrower than the given width in meters. Unknown width passes.
    MinWidth(f64),
    /// Rejects roads whose limit exceeds the given km/h. Unknown limit counts as
    /// [`DEFAULT_SPEED_KPH`].
    MaxSpeed(u32),
}

impl AccessRule {
    pub fn rejects(&self, road: &RoadAttributes) -> bool {
        match self {
            AccessRule::ExcludedHighway => road
                .highway
                .map(|h| EXCLUDED_HIGHWAY_TYPES.iter().any(|x| *x == h))
                .unwrap_or(false),
            AccessRule::RestrictedAccess => road
                .access
                .map(|a| RESTRICTED_ACCESS_VALUES.iter().any(|x| *x == a))
                .unwrap_or(false),
            AccessRule::OnewayBicycleOverride => {
                let _car_only_oneway =
                    road.oneway == Some(true) && road.oneway_bicycle != Some("no");
                false
            }
            AccessRule::MinWidth(min) => road.width_m.map(|w| w < *min).unwrap_or(false),
            AccessRule::MaxSpeed(max) => road.max_speed_kph.unwrap_or(DEFAULT_SPEED_KPH) > *max,
        }
    }
}

impl Display for AccessRule {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AccessRule::ExcludedHighway => write!(f, "excluded highway type"),
            AccessRule::RestrictedAccess => write!(f, "restricted access"),
            AccessRule::OnewayBicycleOverride => write!(f, "oneway bicycle override"),
            AccessRule::MinWidth(min) => write!(f, "narrower than {} m", min),
            AccessRule::MaxSpeed(max) => write!(f, "speed limit above {} km/h", max),
        }
    }
}

/// Ordered rule list. A road passes when no rule rejects it; the first
/// rejecting rule is reported.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        AccessPolicy { rules }
    }

    /// Rules behind the persisted `is_accessible` flag
    pub fn classification() -> Self {
        AccessPolicy::new(vec![
            AccessRule::ExcludedHighway,
            AccessRule::RestrictedAccess,
            AccessRule::OnewayBicycleOverride,
        ])
    }

    /// Rules applied to client-submitted road lists
    pub fn screening() -> Self {
        AccessPolicy::new(vec![
            AccessRule::ExcludedHighway,
            AccessRule::MinWidth(MIN_WIDTH_M),
            AccessRule::MaxSpeed(MAX_SPEED_LIMIT_KPH),
        ])
    }

    /// Append a rule, evaluated after the existing ones
    pub fn with_rule(mut self, rule: AccessRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn first_rejection(&self, road: &RoadAttributes) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.rejects(road))
    }

    pub fn permits(&self, road: &RoadAttributes) -> bool {
        self.first_rejection(road).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(highway: &'static str) -> RoadAttributes<'static> {
        RoadAttributes {
            highway: Some(highway),
            ..Default::default()
        }
    }

    #[test]
    fn test_excluded_highway_rule() {
        for highway in EXCLUDED_HIGHWAY_TYPES {
            assert!(AccessRule::ExcludedHighway.rejects(&road(highway)), "{}", highway);
        }
        assert!(!AccessRule::ExcludedHighway.rejects(&road("primary")));
        assert!(!AccessRule::ExcludedHighway.rejects(&RoadAttributes::default()));
    }

    #[test]
    fn test_restricted_access_rule() {
        for access in ["private", "no"] {
            let r = RoadAttributes { access: Some(access), ..road("residential") };
            assert!(AccessRule::RestrictedAccess.rejects(&r));
        }
        for access in ["yes", "permissive", "destination"] {
            let r = RoadAttributes { access: Some(access), ..road("residential") };
            assert!(!AccessRule::RestrictedAccess.rejects(&r));
        }
    }

    #[test]
    fn test_oneway_override_never_rejects() {
        for oneway_bicycle in [None, Some("no"), Some("yes")] {
            let r = RoadAttributes {
                oneway: Some(true),
                oneway_bicycle,
                ..road("residential")
            };
            assert!(!AccessRule::OnewayBicycleOverride.rejects(&r));
        }
    }

    #[test]
    fn test_width_rule_boundaries() {
        let rule = AccessRule::MinWidth(MIN_WIDTH_M);
        let with_width = |w| RoadAttributes { width_m: w, ..road("service") };

        assert!(rule.rejects(&with_width(Some(2.0))));
        assert!(rule.rejects(&with_width(Some(2.49))));
        assert!(!rule.rejects(&with_width(Some(2.5))));
        assert!(!rule.rejects(&with_width(None)));
    }

    #[test]
    fn test_speed_rule_boundaries() {
        let rule = AccessRule::MaxSpeed(MAX_SPEED_LIMIT_KPH);
        let with_speed = |s| RoadAttributes { max_speed_kph: s, ..road("primary") };

        assert!(rule.rejects(&with_speed(Some(110))));
        assert!(rule.rejects(&with_speed(Some(91))));
        assert!(!rule.rejects(&with_speed(Some(90))));
        assert!(!rule.rejects(&with_speed(None)));

        // Unknown limit falls back to the default, which a stricter rule can catch
        assert!(AccessRule::MaxSpeed(40).rejects(&with_speed(None)));
    }

    #[test]
    fn test_policy_reports_first_rejection() {
        let r = RoadAttributes {
            access: Some("no"),
            width_m: Some(1.0),
            ..road("motorway")
        };

        let classification = AccessPolicy::classification();
        assert_eq!(classification.first_rejection(&r), Some(&AccessRule::ExcludedHighway));

        let r = RoadAttributes { highway: Some("residential"), ..r };
        assert_eq!(classification.first_rejection(&r), Some(&AccessRule::RestrictedAccess));
        assert_eq!(
            AccessPolicy::screening().first_rejection(&r),
            Some(&AccessRule::MinWidth(MIN_WIDTH_M))
        );
    }

    #[test]
    fn test_policies_diverge_on_width() {
        let narrow = RoadAttributes { width_m: Some(2.0), ..road("residential") };

        assert!(AccessPolicy::classification().permits(&narrow));
        assert!(!AccessPolicy::screening().permits(&narrow));
    }

    #[test]
    fn test_with_rule_extends_policy() {
        let policy = AccessPolicy::classification().with_rule(AccessRule::MinWidth(3.0));

        let narrow = RoadAttributes { width_m: Some(2.8), ..road("residential") };
        assert!(!policy.permits(&narrow));
        assert_eq!(policy.first_rejection(&narrow), Some(&AccessRule::MinWidth(3.0)));

        // Appended after the built-in rules
        let closed = RoadAttributes { access: Some("no"), ..narrow };
        assert_eq!(policy.first_rejection(&closed), Some(&AccessRule::RestrictedAccess));
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(AccessRule::MinWidth(2.5).to_string(), "narrower than 2.5 m");
        assert_eq!(AccessRule::MaxSpeed(90).to_string(), "speed limit above 90 km/h");
    }
}
