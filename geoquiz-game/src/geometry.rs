//! Geographic primitives: click coordinates, great-circle distance and
//! region boundaries.
//!
//! Boundaries arrive as GeoJSON geometries in WGS84 (`[lng, lat]` positions)
//! and are held as [`geo::MultiPolygon`]s with `x = lng` and `y = lat`.
use ::geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

/// A point on the map in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` on a sphere of the given radius.
    #[must_use]
    pub fn distance_km(&self, other: &Self, earth_radius_km: f64) -> f64 {
        haversine_km(*self, *other, earth_radius_km)
    }

    const fn to_point(self) -> Point<f64> {
        Point(Coord {
            x: self.lng,
            y: self.lat,
        })
    }
}

/// Haversine distance between two coordinates.
#[must_use]
pub fn haversine_km(from: Coordinate, to: Coordinate, earth_radius_km: f64) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    earth_radius_km * c
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("position has {0} components, expected at least 2")]
    ShortPosition(usize),
    #[error("polygon has no exterior ring")]
    MissingRing,
    #[error("geometry has no coordinates")]
    Empty,
}

/// GeoJSON geometry as delivered by the external data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoJsonGeometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

/// Boundary of a region together with its bounding-box center.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    shape: MultiPolygon<f64>,
    center: Coordinate,
}

impl Boundary {
    /// Build a boundary from a GeoJSON geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if a position is malformed, a polygon lacks its
    /// exterior ring, or the geometry contains no coordinates at all.
    pub fn from_geojson(geometry: &GeoJsonGeometry) -> Result<Self, GeoError> {
        let polygons = match geometry {
            GeoJsonGeometry::Polygon(rings) => vec![polygon_from_rings(rings)?],
            GeoJsonGeometry::MultiPolygon(parts) => parts
                .iter()
                .map(|rings| polygon_from_rings(rings))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Self::from_shape(MultiPolygon::new(polygons))
    }

    /// Wrap an existing shape.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Empty`] if the shape has no bounding box.
    pub fn from_shape(shape: MultiPolygon<f64>) -> Result<Self, GeoError> {
        let rect = shape.bounding_rect().ok_or(GeoError::Empty)?;
        let mid = rect.center();
        Ok(Self {
            shape,
            center: Coordinate::new(mid.y, mid.x),
        })
    }

    /// Axis-aligned rectangle spanning `south_west` to `north_east`.
    #[must_use]
    pub fn rectangle(south_west: Coordinate, north_east: Coordinate) -> Self {
        let ring = LineString::from(vec![
            (south_west.lng, south_west.lat),
            (north_east.lng, south_west.lat),
            (north_east.lng, north_east.lat),
            (south_west.lng, north_east.lat),
            (south_west.lng, south_west.lat),
        ]);
        let shape = MultiPolygon::new(vec![Polygon::new(ring, Vec::new())]);
        let center = Coordinate::new(
            f64::midpoint(south_west.lat, north_east.lat),
            f64::midpoint(south_west.lng, north_east.lng),
        );
        Self { shape, center }
    }

    /// Center of the bounding box, used as the region's scoring centroid.
    #[must_use]
    pub const fn center(&self) -> Coordinate {
        self.center
    }

    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.shape.contains(&point.to_point())
    }

    #[must_use]
    pub const fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, GeoError> {
    let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
    let exterior = rings.next().ok_or(GeoError::MissingRing)??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>, GeoError> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [lng, lat, ..] => Ok(Coord { x: *lng, y: *lat }),
            other => Err(GeoError::ShortPosition(other.len())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}
