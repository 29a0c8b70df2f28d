use std::fmt::{Display, Formatter};

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Rough length of one degree, used to turn a radius into a box
pub const KM_PER_DEGREE: f64 = 111.0;

/// Axis-aligned lon/lat rectangle in degrees.
///
/// Only the ordering of the edges is validated. Values outside ±90/±180 are
/// accepted and simply match nothing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Validated box from its four edges
    ///
    /// # Arguments
    /// * `north`, `south` - Latitude edges in degrees, `north >= south`
    /// * `east`, `west` - Longitude edges in degrees, `east >= west`
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, QueryError> {
        if [north, south, east, west].iter().any(|v| !v.is_finite()) {
            return Err(QueryError::InvalidBounds(
                "bounds must be finite numbers".to_string(),
            ));
        }
        if north < south {
            return Err(QueryError::InvalidBounds(format!(
                "north ({}) is below south ({})",
                north, south
            )));
        }
        if east < west {
            return Err(QueryError::InvalidBounds(format!(
                "east ({}) is below west ({})",
                east, west
            )));
        }

        Ok(BoundingBox {
            north,
            south,
            east,
            west,
        })
    }

    /// Parse raw request parameters
    ///
    /// # Returns
    /// The box, or `InvalidBounds` naming the missing or non-numeric edge
    pub fn from_query(
        north: Option<&str>,
        south: Option<&str>,
        east: Option<&str>,
        west: Option<&str>,
    ) -> Result<Self, QueryError> {
        fn number(name: &str, raw: Option<&str>) -> Result<f64, QueryError> {
            let raw = raw.ok_or_else(|| QueryError::InvalidBounds(format!("missing {}", name)))?;
            raw.trim().parse::<f64>().map_err(|_| {
                QueryError::InvalidBounds(format!("{} is not a number: {:?}", name, raw))
            })
        }

        BoundingBox::new(
            number("north", north)?,
            number("south", south)?,
            number("east", east)?,
            number("west", west)?,
        )
    }

    /// Box of `radius_km` around a center point.
    ///
    /// Uses the same degrees-per-km factor on both axes, so the box narrows in
    /// real distance east-west away from the equator.
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Self {
        let delta = radius_km.abs() / KM_PER_DEGREE;

        BoundingBox {
            north: lat + delta,
            south: lat - delta,
            east: lon + delta,
            west: lon - delta,
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.south,
            },
            Coord {
                x: self.east,
                y: self.north,
            },
        )
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{:.5},{:.5} .. {:.5},{:.5}]",
            self.south, self.west, self.north, self.east
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_accepts_valid_and_degenerate() {
        assert!(BoundingBox::new(42.0, 41.0, 13.0, 12.0).is_ok());
        // Zero-area boxes are well formed
        assert!(BoundingBox::new(41.0, 41.0, 12.0, 12.0).is_ok());
        // Out of geographic range is not an error
        assert!(BoundingBox::new(120.0, 95.0, 400.0, 200.0).is_ok());
    }

    #[test]
    fn test_new_rejects_inverted_edges() {
        assert!(matches!(
            BoundingBox::new(41.0, 42.0, 13.0, 12.0),
            Err(QueryError::InvalidBounds(_))
        ));
        assert!(matches!(
            BoundingBox::new(42.0, 41.0, 12.0, 13.0),
            Err(QueryError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 0.0).is_err());
        assert!(BoundingBox::new(f64::INFINITY, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_from_query() {
        let bbox =
            BoundingBox::from_query(Some("41.91"), Some("41.89"), Some(" 12.51"), Some("12.48"))
                .unwrap();
        assert_eq!(bbox.north, 41.91);
        assert_eq!(bbox.east, 12.51);

        let err = BoundingBox::from_query(Some("abc"), Some("41.89"), Some("12.51"), Some("12.48"));
        assert!(matches!(err, Err(QueryError::InvalidBounds(msg)) if msg.contains("north")));

        let err = BoundingBox::from_query(Some("41.91"), None, Some("12.51"), Some("12.48"));
        assert!(matches!(
            err,
            Err(QueryError::InvalidBounds(msg)) if msg.contains("missing south")
        ));
    }

    #[test]
    fn test_around() {
        let bbox = BoundingBox::around(41.9028, 12.4964, 11.1);

        assert_relative_eq!(bbox.north, 42.0028, epsilon = 1e-9);
        assert_relative_eq!(bbox.south, 41.8028, epsilon = 1e-9);
        assert_relative_eq!(bbox.east, 12.5964, epsilon = 1e-9);
        assert_relative_eq!(bbox.west, 12.3964, epsilon = 1e-9);
    }

    #[test]
    fn test_to_rect_corners() {
        let rect = BoundingBox::new(2.0, 1.0, 4.0, 3.0).unwrap().to_rect();

        assert_eq!(rect.min(), Coord { x: 3.0, y: 1.0 });
        assert_eq!(rect.max(), Coord { x: 4.0, y: 2.0 });
    }
}
