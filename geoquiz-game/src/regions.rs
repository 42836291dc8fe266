//! Region catalogue: the ORP polygons a player must identify, grouped into
//! districts (okresy) and the 14 region-groups (kraje).
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::geometry::{Boundary, Coordinate, GeoError, GeoJsonGeometry};

/// One entry of the fixed region-group table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionGroup {
    pub code: u16,
    pub name: &'static str,
}

/// The 14 region-groups keyed by their statistical code.
pub const REGION_GROUPS: [RegionGroup; 14] = [
    RegionGroup {
        code: 19,
        name: "Hlavní město Praha",
    },
    RegionGroup {
        code: 27,
        name: "Středočeský kraj",
    },
    RegionGroup {
        code: 35,
        name: "Jihočeský kraj",
    },
    RegionGroup {
        code: 43,
        name: "Plzeňský kraj",
    },
    RegionGroup {
        code: 51,
        name: "Karlovarský kraj",
    },
    RegionGroup {
        code: 60,
        name: "Ústecký kraj",
    },
    RegionGroup {
        code: 78,
        name: "Liberecký kraj",
    },
    RegionGroup {
        code: 86,
        name: "Královéhradecký kraj",
    },
    RegionGroup {
        code: 94,
        name: "Pardubický kraj",
    },
    RegionGroup {
        code: 108,
        name: "Kraj Vysočina",
    },
    RegionGroup {
        code: 116,
        name: "Jihomoravský kraj",
    },
    RegionGroup {
        code: 124,
        name: "Olomoucký kraj",
    },
    RegionGroup {
        code: 132,
        name: "Moravskoslezský kraj",
    },
    RegionGroup {
        code: 141,
        name: "Zlínský kraj",
    },
];

/// Display name for a group code.
#[must_use]
pub fn group_name(code: u16) -> Option<&'static str> {
    REGION_GROUPS
        .iter()
        .find(|group| group.code == code)
        .map(|group| group.name)
}

/// Group code for a display name.
#[must_use]
pub fn group_code(name: &str) -> Option<u16> {
    REGION_GROUPS
        .iter()
        .find(|group| group.name == name)
        .map(|group| group.code)
}

/// Failed lookup of a region code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown region code {0}")]
pub struct UnknownRegion(pub u32);

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("region {code} has an invalid boundary: {source}")]
    Geometry { code: u32, source: GeoError },
    #[error("region code {0} appears more than once")]
    DuplicateCode(u32),
}

/// An immutable quiz region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub code: u32,
    pub name: String,
    pub district: String,
    pub group_code: Option<u16>,
    pub population: u64,
    pub boundary: Boundary,
}

impl Region {
    /// Name of the region-group, if the code is one of the known 14.
    #[must_use]
    pub fn group_name(&self) -> Option<&'static str> {
        self.group_code.and_then(group_name)
    }

    /// Scoring centroid (bounding-box center of the boundary).
    #[must_use]
    pub const fn centroid(&self) -> Coordinate {
        self.boundary.center()
    }

    #[must_use]
    pub fn matches(&self, filter: &RegionFilter) -> bool {
        match filter {
            RegionFilter::All => true,
            RegionFilter::District(district) => &self.district == district,
            RegionFilter::Group(group) => self.group_name() == Some(group.as_str()),
        }
    }
}

/// Subset of the map a game session is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RegionFilter {
    #[default]
    All,
    District(String),
    Group(String),
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::District(name) => write!(f, "district:{name}"),
            Self::Group(name) => write!(f, "group:{name}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: GeoJsonGeometry,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    kod: u32,
    nazev: String,
    #[serde(default)]
    okres: String,
    #[serde(default)]
    kraj_kod: Option<u16>,
    #[serde(default)]
    pocet_obyvatel: Option<u64>,
}

/// Read-only set of regions loaded once per game.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalogue {
    regions: Vec<Region>,
    index: HashMap<u32, usize>,
}

impl RegionCatalogue {
    /// Build a catalogue, preserving the given order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::DuplicateCode`] if two regions share a code.
    pub fn from_regions(regions: Vec<Region>) -> Result<Self, CatalogueError> {
        let mut index = HashMap::with_capacity(regions.len());
        for (pos, region) in regions.iter().enumerate() {
            if index.insert(region.code, pos).is_some() {
                return Err(CatalogueError::DuplicateCode(region.code));
            }
        }
        Ok(Self { regions, index })
    }

    /// Parse a GeoJSON `FeatureCollection` as served by the data layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid GeoJSON, a boundary is
    /// malformed, or a region code is repeated.
    pub fn from_geojson(json: &str) -> Result<Self, CatalogueError> {
        let collection: FeatureCollection = serde_json::from_str(json)?;
        let regions = collection
            .features
            .into_iter()
            .map(|feature| {
                let props = feature.properties;
                let boundary = Boundary::from_geojson(&feature.geometry).map_err(|source| {
                    CatalogueError::Geometry {
                        code: props.kod,
                        source,
                    }
                })?;
                Ok(Region {
                    code: props.kod,
                    name: props.nazev,
                    district: props.okres,
                    group_code: props.kraj_kod,
                    population: props.pocet_obyvatel.unwrap_or_default(),
                    boundary,
                })
            })
            .collect::<Result<Vec<_>, CatalogueError>>()?;
        log::debug!("loaded {} regions from GeoJSON", regions.len());
        Self::from_regions(regions)
    }

    #[must_use]
    pub fn get(&self, code: u32) -> Option<&Region> {
        self.index.get(&code).map(|&pos| &self.regions[pos])
    }

    /// Look up a region, failing loudly on unknown codes.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRegion`] if no region has this code.
    pub fn require(&self, code: u32) -> Result<&Region, UnknownRegion> {
        self.get(code).ok_or(UnknownRegion(code))
    }

    /// Scoring centroid of a region.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRegion`] if no region has this code.
    pub fn centroid(&self, code: u32) -> Result<Coordinate, UnknownRegion> {
        self.require(code).map(Region::centroid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions inside the filter, in catalogue order.
    pub fn matching<'a>(&'a self, filter: &'a RegionFilter) -> impl Iterator<Item = &'a Region> {
        self.regions
            .iter()
            .filter(move |region| region.matches(filter))
    }

    /// Distinct district names, sorted.
    #[must_use]
    pub fn districts(&self) -> Vec<&str> {
        self.regions
            .iter()
            .map(|region| region.district.as_str())
            .filter(|district| !district.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Region-group names present in the catalogue, in table order.
    #[must_use]
    pub fn groups(&self) -> Vec<&'static str> {
        REGION_GROUPS
            .iter()
            .filter(|group| {
                self.regions
                    .iter()
                    .any(|region| region.group_code == Some(group.code))
            })
            .map(|group| group.name)
            .collect()
    }

    /// Region whose boundary contains the point.
    #[must_use]
    pub fn region_at(&self, point: Coordinate) -> Option<&Region> {
        self.regions
            .iter()
            .find(|region| region.boundary.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_REGIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 3101,
                "properties": { "kod": 3101, "nazev": "České Budějovice", "okres": "České Budějovice", "kraj_kod": 35, "pocet_obyvatel": 187000 },
                "geometry": { "type": "Polygon", "coordinates": [[[14.2,48.8],[14.7,48.8],[14.7,49.2],[14.2,49.2],[14.2,48.8]]] }
            },
            {
                "type": "Feature",
                "id": 6202,
                "properties": { "kod": 6202, "nazev": "Brno", "okres": "Brno-město", "kraj_kod": 116 },
                "geometry": { "type": "MultiPolygon", "coordinates": [[[[16.5,49.1],[16.7,49.1],[16.7,49.3],[16.5,49.3],[16.5,49.1]]]] }
            }
        ]
    }"#;

    #[test]
    fn group_table_lookups_work_both_ways() {
        assert_eq!(REGION_GROUPS.len(), 14);
        assert_eq!(group_name(35), Some("Jihočeský kraj"));
        assert_eq!(group_code("Kraj Vysočina"), Some(108));
        assert_eq!(group_name(999), None);
        assert_eq!(group_code("Bavaria"), None);
    }

    #[test]
    fn parses_feature_collection_in_order() {
        let catalogue = RegionCatalogue::from_geojson(TWO_REGIONS).unwrap();
        assert_eq!(catalogue.len(), 2);
        let codes: Vec<u32> = catalogue.iter().map(|r| r.code).collect();
        assert_eq!(codes, vec![3101, 6202]);

        let budejovice = catalogue.get(3101).unwrap();
        assert_eq!(budejovice.group_name(), Some("Jihočeský kraj"));
        assert_eq!(budejovice.population, 187_000);
        assert_eq!(budejovice.centroid(), Coordinate::new(49.0, 14.45));

        let brno = catalogue.get(6202).unwrap();
        assert_eq!(brno.population, 0);
        assert_eq!(brno.district, "Brno-město");
    }

    #[test]
    fn unknown_codes_fail_loudly() {
        let catalogue = RegionCatalogue::from_geojson(TWO_REGIONS).unwrap();
        assert_eq!(catalogue.centroid(42), Err(UnknownRegion(42)));
        assert_eq!(UnknownRegion(42).to_string(), "unknown region code 42");
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let region = Region {
            code: 1,
            name: "A".into(),
            district: "D".into(),
            group_code: None,
            population: 0,
            boundary: Boundary::rectangle(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)),
        };
        let err = RegionCatalogue::from_regions(vec![region.clone(), region]).unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateCode(1)));
    }

    #[test]
    fn bad_geometry_reports_region_code() {
        let json = r#"{"features":[{"properties":{"kod":7,"nazev":"X"},"geometry":{"type":"MultiPolygon","coordinates":[]}}]}"#;
        let err = RegionCatalogue::from_geojson(json).unwrap_err();
        assert!(matches!(err, CatalogueError::Geometry { code: 7, .. }));
    }

    #[test]
    fn filters_districts_and_groups() {
        let catalogue = RegionCatalogue::from_geojson(TWO_REGIONS).unwrap();
        assert_eq!(
            catalogue.districts(),
            vec!["Brno-město", "České Budějovice"]
        );
        assert_eq!(
            catalogue.groups(),
            vec!["Jihočeský kraj", "Jihomoravský kraj"]
        );

        let south = RegionFilter::Group("Jihočeský kraj".into());
        let names: Vec<&str> = catalogue
            .matching(&south)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["České Budějovice"]);

        let brno = RegionFilter::District("Brno-město".into());
        assert_eq!(catalogue.matching(&brno).count(), 1);
        assert_eq!(catalogue.matching(&RegionFilter::All).count(), 2);
    }

    #[test]
    fn hit_test_finds_containing_region() {
        let catalogue = RegionCatalogue::from_geojson(TWO_REGIONS).unwrap();
        let hit = catalogue.region_at(Coordinate::new(49.2, 16.6)).unwrap();
        assert_eq!(hit.code, 6202);
        assert!(catalogue.region_at(Coordinate::new(50.0, 12.0)).is_none());
    }

    #[test]
    fn filter_serializes_with_type_and_value() {
        let json = serde_json::to_string(&RegionFilter::District("Tábor".into())).unwrap();
        assert_eq!(json, r#"{"type":"district","value":"Tábor"}"#);
        let all: RegionFilter = serde_json::from_str(r#"{"type":"all"}"#).unwrap();
        assert_eq!(all, RegionFilter::All);
        assert_eq!(
            RegionFilter::Group("Zlínský kraj".into()).to_string(),
            "group:Zlínský kraj"
        );
    }
}
