//! Coordinate Reference System types and utilities.
//!
//! Each supported CRS carries enough of its definition to drive the
//! projection math (`CrsDefinition`) and to describe itself to GIS readers
//! through CF grid-mapping attributes and a WKT string.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attributes::{keys, Attributes};

/// Well-known CRS codes supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// ETRS89 Geographic (lat/lon in degrees)
    Epsg4258,
    /// ETRS89-extended / LAEA Europe (meters)
    Epsg3035,
    /// Web Mercator (meters)
    Epsg3857,
}

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub name: &'static str,
    pub semi_major_axis: f64,
    /// Zero for a sphere.
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        name: "WGS 84",
        semi_major_axis: 6378137.0,
        inverse_flattening: 298.257223563,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        name: "GRS 1980",
        semi_major_axis: 6378137.0,
        inverse_flattening: 298.257222101,
    };

    pub fn flattening(&self) -> f64 {
        if self.inverse_flattening == 0.0 {
            0.0
        } else {
            1.0 / self.inverse_flattening
        }
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening())
    }

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }
}

/// Projection family and parameters of a CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrsDefinition {
    Geographic {
        ellipsoid: Ellipsoid,
    },
    LambertAzimuthalEqualArea {
        ellipsoid: Ellipsoid,
        /// Latitude of natural origin (degrees)
        lat0: f64,
        /// Longitude of natural origin (degrees)
        lon0: f64,
        false_easting: f64,
        false_northing: f64,
    },
    /// Spherical ("pseudo") Mercator on a sphere of radius `radius`.
    WebMercator {
        radius: f64,
    },
}

const WKT_4326: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;

const WKT_4258: &str = r#"GEOGCS["ETRS89",DATUM["European_Terrestrial_Reference_System_1989",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6258"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4258"]]"#;

const WKT_3035: &str = r#"PROJCS["ETRS89-extended / LAEA Europe",GEOGCS["ETRS89",DATUM["European_Terrestrial_Reference_System_1989",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6258"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4258"]],PROJECTION["Lambert_Azimuthal_Equal_Area"],PARAMETER["latitude_of_center",52],PARAMETER["longitude_of_center",10],PARAMETER["false_easting",4321000],PARAMETER["false_northing",3210000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Northing",NORTH],AXIS["Easting",EAST],AUTHORITY["EPSG","3035"]]"#;

const WKT_3857: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#;

impl CrsCode {
    /// All supported codes.
    pub const ALL: [CrsCode; 4] = [
        CrsCode::Epsg4326,
        CrsCode::Epsg4258,
        CrsCode::Epsg3035,
        CrsCode::Epsg3857,
    ];

    /// Parse an `authority:code` identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:3035"
    /// - "CRS:84" (equivalent to EPSG:4326 with lon/lat axis order)
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" || normalized == "OGC:CRS84" {
            return Ok(CrsCode::Epsg4326);
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;
        let code: u32 = code
            .parse()
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))?;
        Self::from_epsg(code)
    }

    /// Look up a numeric EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        Self::ALL
            .into_iter()
            .find(|c| c.epsg() == code)
            .ok_or_else(|| CrsParseError::UnsupportedCrs(format!("EPSG:{}", code)))
    }

    /// Recover a code from a WKT string by its outermost EPSG authority.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        // The CRS's own AUTHORITY node closes the WKT, so it is the last one.
        let marker = "AUTHORITY[\"EPSG\",\"";
        let start = wkt.rfind(marker)? + marker.len();
        let digits: String = wkt[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
        Self::from_epsg(digits.parse().ok()?).ok()
    }

    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg4258 => 4258,
            CrsCode::Epsg3035 => 3035,
            CrsCode::Epsg3857 => 3857,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4258)
    }

    /// Human-readable CRS name.
    pub fn name(&self) -> &'static str {
        match self {
            CrsCode::Epsg4326 => "WGS 84",
            CrsCode::Epsg4258 => "ETRS89",
            CrsCode::Epsg3035 => "ETRS89-extended / LAEA Europe",
            CrsCode::Epsg3857 => "WGS 84 / Pseudo-Mercator",
        }
    }

    /// Suffix used when formatting a resolution in this CRS's linear unit.
    pub fn unit_suffix(&self) -> &'static str {
        if self.is_geographic() {
            "deg"
        } else {
            "m"
        }
    }

    pub fn definition(&self) -> CrsDefinition {
        match self {
            CrsCode::Epsg4326 => CrsDefinition::Geographic {
                ellipsoid: Ellipsoid::WGS84,
            },
            CrsCode::Epsg4258 => CrsDefinition::Geographic {
                ellipsoid: Ellipsoid::GRS80,
            },
            CrsCode::Epsg3035 => CrsDefinition::LambertAzimuthalEqualArea {
                ellipsoid: Ellipsoid::GRS80,
                lat0: 52.0,
                lon0: 10.0,
                false_easting: 4321000.0,
                false_northing: 3210000.0,
            },
            CrsCode::Epsg3857 => CrsDefinition::WebMercator { radius: 6378137.0 },
        }
    }

    pub fn wkt(&self) -> &'static str {
        match self {
            CrsCode::Epsg4326 => WKT_4326,
            CrsCode::Epsg4258 => WKT_4258,
            CrsCode::Epsg3035 => WKT_3035,
            CrsCode::Epsg3857 => WKT_3857,
        }
    }

    /// CF-convention grid-mapping attributes for this CRS.
    ///
    /// The set mirrors what CF-aware writers emit for a `spatial_ref`
    /// companion variable: the WKT (under both `crs_wkt` and the GDAL
    /// `spatial_ref` key), ellipsoid and prime meridian description, and the
    /// projection parameters keyed by their CF names.
    pub fn cf_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(keys::CRS_WKT, self.wkt());

        let (ellipsoid, geographic_name, datum_name) = match self {
            CrsCode::Epsg4326 | CrsCode::Epsg3857 => {
                (Ellipsoid::WGS84, "WGS 84", "World Geodetic System 1984")
            }
            CrsCode::Epsg4258 | CrsCode::Epsg3035 => (
                Ellipsoid::GRS80,
                "ETRS89",
                "European Terrestrial Reference System 1989 ensemble",
            ),
        };

        match self.definition() {
            CrsDefinition::WebMercator { radius } => {
                attrs.insert("semi_major_axis", radius);
                attrs.insert("semi_minor_axis", radius);
                attrs.insert("inverse_flattening", 0.0);
            }
            _ => {
                attrs.insert("semi_major_axis", ellipsoid.semi_major_axis);
                attrs.insert("semi_minor_axis", ellipsoid.semi_minor_axis());
                attrs.insert("inverse_flattening", ellipsoid.inverse_flattening);
            }
        }
        attrs.insert("reference_ellipsoid_name", ellipsoid.name);
        attrs.insert("longitude_of_prime_meridian", 0.0);
        attrs.insert("prime_meridian_name", "Greenwich");
        attrs.insert("geographic_crs_name", geographic_name);
        attrs.insert("horizontal_datum_name", datum_name);

        match self.definition() {
            CrsDefinition::Geographic { .. } => {
                attrs.insert("grid_mapping_name", "latitude_longitude");
            }
            CrsDefinition::LambertAzimuthalEqualArea {
                lat0,
                lon0,
                false_easting,
                false_northing,
                ..
            } => {
                attrs.insert("projected_crs_name", self.name());
                attrs.insert("grid_mapping_name", "lambert_azimuthal_equal_area");
                attrs.insert("latitude_of_projection_origin", lat0);
                attrs.insert("longitude_of_projection_origin", lon0);
                attrs.insert("false_easting", false_easting);
                attrs.insert("false_northing", false_northing);
            }
            CrsDefinition::WebMercator { .. } => {
                attrs.insert("projected_crs_name", self.name());
                attrs.insert("grid_mapping_name", "mercator");
                attrs.insert("standard_parallel", 0.0);
                attrs.insert("longitude_of_projection_origin", 0.0);
                attrs.insert("false_easting", 0.0);
                attrs.insert("false_northing", 0.0);
            }
        }

        attrs.insert(keys::SPATIAL_REF, self.wkt());
        attrs
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CrsCode::parse(&value)
    }
}

impl From<CrsCode> for String {
    fn from(value: CrsCode) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for CrsCode {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrsCode::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(CrsCode::parse("EPSG:4326").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("epsg:3035").unwrap(), CrsCode::Epsg3035);
        assert_eq!(CrsCode::parse(" EPSG:3857 ").unwrap(), CrsCode::Epsg3857);
        assert_eq!(CrsCode::parse("CRS:84").unwrap(), CrsCode::Epsg4326);
        assert!(CrsCode::parse("EPSG:99999").is_err());
        assert!(CrsCode::parse("3035").is_err());
        assert!(CrsCode::parse("EPSG:abc").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for code in CrsCode::ALL {
            assert_eq!(CrsCode::parse(&code.to_string()).unwrap(), code);
        }
    }

    #[test]
    fn test_wkt_authority_recovers_code() {
        for code in CrsCode::ALL {
            assert_eq!(CrsCode::from_wkt(code.wkt()), Some(code), "{}", code);
        }
        assert_eq!(CrsCode::from_wkt("LOCAL_CS[\"arbitrary\"]"), None);
    }

    #[test]
    fn test_cf_attributes_laea() {
        let attrs = CrsCode::Epsg3035.cf_attributes();
        assert_eq!(attrs.text("grid_mapping_name"), Some("lambert_azimuthal_equal_area"));
        assert_eq!(attrs.get("latitude_of_projection_origin").and_then(|v| v.as_f64()), Some(52.0));
        assert_eq!(attrs.get("false_easting").and_then(|v| v.as_f64()), Some(4321000.0));
        assert_eq!(attrs.text(keys::CRS_WKT), Some(CrsCode::Epsg3035.wkt()));
        let semi_minor = attrs.get("semi_minor_axis").and_then(|v| v.as_f64()).unwrap();
        assert!((semi_minor - 6356752.314140356).abs() < 1e-6);
    }

    #[test]
    fn test_cf_attributes_geographic() {
        let attrs = CrsCode::Epsg4326.cf_attributes();
        assert_eq!(attrs.text("grid_mapping_name"), Some("latitude_longitude"));
        assert!(!attrs.contains("false_easting"));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(CrsCode::try_from("EPSG:3035".to_string()), Ok(CrsCode::Epsg3035));
        assert_eq!(String::from(CrsCode::Epsg4258), "EPSG:4258");
        assert_eq!("epsg:3857".parse::<CrsCode>(), Ok(CrsCode::Epsg3857));
    }
}
