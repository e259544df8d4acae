//! Parsed spatial reference definitions.

use std::collections::BTreeMap;
use std::fmt;

use proj4rs::Proj;

use super::{epsg, wkt, ReprojectionError};

/// Tokens that never change the meaning of a definition.
const IGNORED_KEYS: &[&str] = &["no_defs", "wktext", "type"];

/// Parameters whose default value is dropped during normalisation.
const DEFAULT_PARAMS: &[(&str, f64)] = &[
    ("lat_0", 0.0),
    ("lon_0", 0.0),
    ("x_0", 0.0),
    ("y_0", 0.0),
    ("lat_ts", 0.0),
    ("k_0", 1.0),
];

/// A coordinate reference system.
///
/// Two references compare equal when their normalised parameter sets are
/// identical, so `EPSG:4326`, `+proj=longlat +datum=WGS84 +no_defs` and the
/// WGS84 WKT are all the same reference even though their text differs.
#[derive(Debug, Clone)]
pub struct SpatialRef {
    definition: String,
    params: BTreeMap<String, String>,
    epsg: Option<u32>,
}

impl PartialEq for SpatialRef {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl Eq for SpatialRef {}

impl SpatialRef {
    /// The geographic reference KML coordinates are expressed in.
    pub fn wgs84() -> Self {
        let params = [("ellps", "WGS84"), ("proj", "longlat")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SpatialRef {
            definition: "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            params,
            epsg: Some(epsg::WGS84_EPSG),
        }
    }

    /// Parse `EPSG:<code>`, an OGC URN, a PROJ string or WKT.
    pub fn from_definition(definition: &str) -> Result<Self, ReprojectionError> {
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(ReprojectionError::MissingSpatialRef);
        }
        if let Some(code) = parse_epsg_code(definition) {
            return Self::from_epsg(code);
        }
        if definition.starts_with('+') {
            return Self::from_proj(definition);
        }
        if definition.contains('[') {
            return wkt::resolve(definition);
        }
        Err(ReprojectionError::InvalidDefinition(definition.to_string()))
    }

    pub fn from_epsg(code: u32) -> Result<Self, ReprojectionError> {
        let definition = epsg::proj_definition(code).ok_or(ReprojectionError::UnknownEpsg(code))?;
        let mut srs = Self::from_proj(&definition)?;
        srs.epsg = Some(code);
        Ok(srs)
    }

    pub fn from_proj(definition: &str) -> Result<Self, ReprojectionError> {
        let tokens = tokenize(definition)?;
        let engine = tokens
            .iter()
            .filter(|(key, value)| {
                !IGNORED_KEYS.contains(&key.as_str())
                    && !(key == "nadgrids" && value.as_deref() == Some("@null"))
            })
            .map(|(key, value)| match value {
                Some(value) => format!("+{}={}", key, value),
                None => format!("+{}", key),
            })
            .collect::<Vec<_>>()
            .join(" ");
        Ok(SpatialRef {
            params: normalise(tokens)?,
            definition: engine,
            epsg: None,
        })
    }

    /// The PROJ string handed to the projection engine.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// EPSG code, when the reference was looked up by one.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Normalised parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True for longitude/latitude references.
    pub fn is_geographic(&self) -> bool {
        self.param("proj") == Some("longlat")
    }

    pub(crate) fn to_proj(&self) -> Result<Proj, ReprojectionError> {
        Proj::from_proj_string(&self.definition)
            .map_err(|e| ReprojectionError::Engine(format!("{} ({})", e, self.definition)))
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => f.write_str(&self.definition),
        }
    }
}

/// Code of an `EPSG:<n>` or `urn:ogc:def:crs:EPSG:[version]:<n>` string.
fn parse_epsg_code(definition: &str) -> Option<u32> {
    let upper = definition.to_ascii_uppercase();
    let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
        rest
    } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
        upper.rsplit(':').next()?
    } else {
        return None;
    };
    code.trim().parse().ok()
}

type Token = (String, Option<String>);

fn tokenize(definition: &str) -> Result<Vec<Token>, ReprojectionError> {
    definition
        .split_whitespace()
        .map(|token| {
            let body = token
                .strip_prefix('+')
                .filter(|b| !b.is_empty())
                .ok_or_else(|| ReprojectionError::InvalidDefinition(definition.to_string()))?;
            Ok(match body.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => (body.to_string(), None),
            })
        })
        .collect()
}

fn normalise(tokens: Vec<Token>) -> Result<BTreeMap<String, String>, ReprojectionError> {
    let mut params = BTreeMap::new();
    for (key, value) in tokens {
        let value = value.unwrap_or_default();
        match key.as_str() {
            k if IGNORED_KEYS.contains(&k) => continue,
            "nadgrids" if value == "@null" => continue,
            "units" if value == "m" => continue,
            "towgs84" if is_zero_shift(&value) => continue,
            "proj" => {
                let proj = match value.as_str() {
                    "latlong" | "lonlat" | "latlon" => "longlat".to_string(),
                    other => other.to_string(),
                };
                params.insert(key, proj);
            }
            "k" => {
                params.insert("k_0".to_string(), format_number(&value));
            }
            _ => {
                params.insert(key, format_number(&value));
            }
        }
    }

    if let Some(datum) = params.remove("datum") {
        let ellps = match datum.as_str() {
            "WGS84" => Some("WGS84"),
            "NAD83" => Some("GRS80"),
            _ => None,
        };
        match ellps {
            Some(ellps) => {
                params
                    .entry("ellps".to_string())
                    .or_insert_with(|| ellps.to_string());
            }
            None => {
                params.insert("datum".to_string(), datum);
            }
        }
    }
    if !params.contains_key("ellps") && !params.contains_key("a") && !params.contains_key("datum")
    {
        params.insert("ellps".to_string(), "WGS84".to_string());
    }

    if params.get("proj").map(String::as_str) == Some("utm") {
        expand_utm(&mut params)?;
    }

    for (key, default) in DEFAULT_PARAMS {
        let is_default = params
            .get(*key)
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v == *default)
            .unwrap_or(false);
        if is_default {
            params.remove(*key);
        }
    }

    Ok(params)
}

/// Rewrite `+proj=utm +zone=n [+south]` as its transverse Mercator parameters.
fn expand_utm(params: &mut BTreeMap<String, String>) -> Result<(), ReprojectionError> {
    let zone: i32 = params
        .remove("zone")
        .and_then(|z| z.parse().ok())
        .filter(|z| (1..=60).contains(z))
        .ok_or_else(|| ReprojectionError::InvalidDefinition("utm without a valid zone".into()))?;
    let south = params.remove("south").is_some();

    params.insert("proj".to_string(), "tmerc".to_string());
    params.insert("lon_0".to_string(), format_number(&(6 * zone - 183).to_string()));
    params.insert("k_0".to_string(), "0.9996".to_string());
    params.insert("x_0".to_string(), "500000".to_string());
    if south {
        params.insert("y_0".to_string(), "10000000".to_string());
    }
    Ok(())
}

fn is_zero_shift(value: &str) -> bool {
    value
        .split(',')
        .all(|v| v.trim().parse::<f64>().map(|v| v == 0.0).unwrap_or(false))
}

/// Canonical text for numeric values so `3`, `3.0` and `3.000` agree.
fn format_number(value: &str) -> String {
    if value.contains(',') {
        return value
            .split(',')
            .map(format_number)
            .collect::<Vec<_>>()
            .join(",");
    }
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => number.to_string(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_equivalent_forms() {
        let wgs84 = SpatialRef::wgs84();
        assert_eq!(SpatialRef::from_definition("EPSG:4326").unwrap(), wgs84);
        assert_eq!(SpatialRef::from_definition("epsg:4326").unwrap(), wgs84);
        assert_eq!(
            SpatialRef::from_definition("urn:ogc:def:crs:EPSG::4326").unwrap(),
            wgs84
        );
        assert_eq!(
            SpatialRef::from_definition("+proj=longlat +datum=WGS84 +no_defs").unwrap(),
            wgs84
        );
        assert_eq!(
            SpatialRef::from_definition("+proj=latlong +ellps=WGS84 +towgs84=0,0,0").unwrap(),
            wgs84
        );
        assert!(wgs84.is_geographic());
    }

    #[test]
    fn test_different_references_differ() {
        let wgs84 = SpatialRef::wgs84();
        let etrs89 = SpatialRef::from_epsg(4258).unwrap();
        let merc = SpatialRef::from_epsg(3857).unwrap();
        assert_ne!(etrs89, wgs84);
        assert_ne!(merc, wgs84);
        assert!(!merc.is_geographic());
    }

    #[test]
    fn test_utm_matches_expanded_tmerc() {
        let utm = SpatialRef::from_definition("EPSG:32633").unwrap();
        let tmerc = SpatialRef::from_definition(
            "+proj=tmerc +lat_0=0 +lon_0=15 +k=0.9996 +x_0=500000 +y_0=0 +datum=WGS84 +units=m",
        )
        .unwrap();
        assert_eq!(utm, tmerc);
        assert_eq!(utm.param("proj"), Some("tmerc"));
        assert_eq!(utm.epsg(), Some(32633));
    }

    #[test]
    fn test_number_formatting_is_normalised() {
        let a = SpatialRef::from_proj("+proj=lcc +lat_1=49 +lat_2=44.0 +ellps=GRS80").unwrap();
        let b = SpatialRef::from_proj("+proj=lcc +lat_1=49.000 +lat_2=44 +ellps=GRS80").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_engine_definition_drops_noise() {
        let srs = SpatialRef::from_proj(
            "+proj=merc +a=6378137 +b=6378137 +nadgrids=@null +wktext +no_defs",
        )
        .unwrap();
        assert_eq!(srs.definition(), "+proj=merc +a=6378137 +b=6378137");
    }

    #[test]
    fn test_invalid_definitions() {
        assert_eq!(
            SpatialRef::from_definition("  "),
            Err(ReprojectionError::MissingSpatialRef)
        );
        assert_eq!(
            SpatialRef::from_definition("EPSG:1"),
            Err(ReprojectionError::UnknownEpsg(1))
        );
        assert!(matches!(
            SpatialRef::from_definition("mercator please"),
            Err(ReprojectionError::InvalidDefinition(_))
        ));
        assert!(matches!(
            SpatialRef::from_definition("+proj=utm +datum=WGS84"),
            Err(ReprojectionError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(SpatialRef::wgs84().to_string(), "EPSG:4326");
        let custom = SpatialRef::from_proj("+proj=longlat +ellps=GRS80").unwrap();
        assert_eq!(custom.to_string(), "+proj=longlat +ellps=GRS80");
    }
}
