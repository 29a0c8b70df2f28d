use std::collections::HashMap;

/// OSM tag map as delivered by Overpass
pub type Tags = HashMap<String, String>;

/// Read-only view over anything that carries OSM-style string tags.
pub trait TagSource {
    fn tag(&self, key: &str) -> Option<&str>;
}

impl TagSource for HashMap<String, String> {
    fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Client-submitted tags; non-string values are treated as absent.
impl TagSource for serde_json::Map<String, serde_json::Value> {
    fn tag(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Attributes the access rules look at, extracted once from a tag map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoadAttributes<'a> {
    pub highway: Option<&'a str>,
    pub access: Option<&'a str>,
    pub oneway: Option<bool>,
    pub oneway_bicycle: Option<&'a str>,
    pub width_m: Option<f64>,
    pub max_speed_kph: Option<u32>,
}

impl<'a> RoadAttributes<'a> {
    pub fn from_tags<T: TagSource + ?Sized>(tags: &'a T) -> Self {
        RoadAttributes {
            highway: tags.tag("highway"),
            access: tags.tag("access"),
            oneway: tags.tag("oneway").and_then(parse_oneway),
            oneway_bicycle: tags.tag("oneway:bicycle"),
            width_m: tags.tag("width").and_then(parse_width),
            max_speed_kph: tags.tag("maxspeed").and_then(parse_max_speed),
        }
    }
}

fn parse_oneway(raw: &str) -> Option<bool> {
    match raw {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Width in meters from a free-text `width` tag.
///
/// Takes the first numeric token ("2.5 m" -> 2.5, "3,5" -> 3, ".5" -> 0.5).
/// A sign directly in front is kept, so "-5" stays negative and fails any
/// minimum-width rule. Zero counts as unknown, same as a missing or
/// unparseable tag.
pub fn parse_width(raw: &str) -> Option<f64> {
    first_number_token(raw, true)?
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w != 0.0)
}

/// Speed limit from a free-text `maxspeed` tag.
///
/// Takes the first integer token with no unit conversion ("50 mph" -> 50).
/// Negative limits are unknown. Values past `u32::MAX` saturate so they still
/// fail a maximum-speed rule.
pub fn parse_max_speed(raw: &str) -> Option<u32> {
    let token = first_number_token(raw, false)?;
    if token.starts_with('-') {
        return None;
    }

    // Only digits are left, so parsing can only fail on overflow
    Some(token.parse::<u32>().unwrap_or(u32::MAX))
}

/// First number in `raw`: an optional `-`, then digits. With `allow_fraction`
/// a single decimal point is accepted, including a leading one (".5").
fn first_number_token(raw: &str, allow_fraction: bool) -> Option<&str> {
    let bytes = raw.as_bytes();
    let mut start = raw.find(|c: char| c.is_ascii_digit())?;
    if allow_fraction && start > 0 && bytes[start - 1] == b'.' {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] == b'-' {
        start -= 1;
    }

    let rest = &raw[start..];
    let mut seen_dot = false;
    let end = rest
        .char_indices()
        .find(|&(i, c)| {
            if c.is_ascii_digit() || (i == 0 && c == '-') {
                false
            } else if c == '.' && allow_fraction && !seen_dot {
                seen_dot = true;
                false
            } else {
                true
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(rest.len());

    Some(rest[..end].trim_end_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_width_plain_and_units() {
        assert_eq!(parse_width("3"), Some(3.0));
        assert_eq!(parse_width("2.5"), Some(2.5));
        assert_eq!(parse_width("2.5 m"), Some(2.5));
        assert_eq!(parse_width("4m"), Some(4.0));
        assert_eq!(parse_width("approx 3.2"), Some(3.2));
    }

    #[test]
    fn test_parse_width_first_token_only() {
        assert_eq!(parse_width("3,5"), Some(3.0));
        assert_eq!(parse_width("2.5;3"), Some(2.5));
        assert_eq!(parse_width("1.2.3"), Some(1.2));
        assert_eq!(parse_width("3."), Some(3.0));
    }

    #[test]
    fn test_parse_width_unknown() {
        assert_eq!(parse_width(""), None);
        assert_eq!(parse_width("narrow"), None);
        assert_eq!(parse_width("0"), None);
        assert_eq!(parse_width("0.0 m"), None);
        assert_eq!(parse_width("-0"), None);
    }

    #[test]
    fn test_parse_width_leading_point_and_sign() {
        assert_eq!(parse_width(".5"), Some(0.5));
        assert_eq!(parse_width("width .75 m"), Some(0.75));
        assert_eq!(parse_width("-5"), Some(-5.0));
        assert_eq!(parse_width("-.5"), Some(-0.5));
        assert_eq!(parse_width("3-4"), Some(3.0));
    }

    #[test]
    fn test_parse_max_speed() {
        assert_eq!(parse_max_speed("50"), Some(50));
        assert_eq!(parse_max_speed("30 mph"), Some(30));
        assert_eq!(parse_max_speed("IT:urban"), None);
        assert_eq!(parse_max_speed("none"), None);
        assert_eq!(parse_max_speed("50;70"), Some(50));
        assert_eq!(parse_max_speed("7.5"), Some(7));
    }

    #[test]
    fn test_parse_max_speed_sign_and_overflow() {
        assert_eq!(parse_max_speed("5000000000"), Some(u32::MAX));
        assert_eq!(parse_max_speed("99999999999999999999999"), Some(u32::MAX));
        assert_eq!(parse_max_speed("4294967295"), Some(u32::MAX));
        assert_eq!(parse_max_speed("-30"), None);
        assert_eq!(parse_max_speed("30-50"), Some(30));
    }

    #[test]
    fn test_attributes_from_tags() {
        let t = tags(&[
            ("highway", "residential"),
            ("access", "private"),
            ("oneway", "yes"),
            ("oneway:bicycle", "no"),
            ("width", "3 m"),
            ("maxspeed", "30"),
        ]);
        let attrs = RoadAttributes::from_tags(&t);

        assert_eq!(attrs.highway, Some("residential"));
        assert_eq!(attrs.access, Some("private"));
        assert_eq!(attrs.oneway, Some(true));
        assert_eq!(attrs.oneway_bicycle, Some("no"));
        assert_eq!(attrs.width_m, Some(3.0));
        assert_eq!(attrs.max_speed_kph, Some(30));
    }

    #[test]
    fn test_attributes_oneway_variants() {
        assert_eq!(RoadAttributes::from_tags(&tags(&[("oneway", "no")])).oneway, Some(false));
        assert_eq!(RoadAttributes::from_tags(&tags(&[("oneway", "-1")])).oneway, None);
        assert_eq!(RoadAttributes::from_tags(&tags(&[])).oneway, None);
    }

    #[test]
    fn test_json_tags_ignore_non_strings() {
        let json = serde_json::json!({"highway": "service", "width": 3});
        let map = json.as_object().unwrap();
        let attrs = RoadAttributes::from_tags(map);

        assert_eq!(attrs.highway, Some("service"));
        assert_eq!(attrs.width_m, None);
    }
}
