//! Resolving WKT definitions (OGC WKT1, WKT2 and ESRI flavours).
//!
//! A definition is resolved, in order, by:
//!
//! 1. the top-level `AUTHORITY["EPSG","n"]` / `ID["EPSG",n]`,
//! 2. an embedded `EXTENSION["PROJ4","..."]`,
//! 3. the top-level CRS name (ESRI and EPSG naming),
//! 4. lowering a WKT1 `GEOGCS`/`PROJCS` to a PROJ string from its
//!    `PROJECTION`, `PARAMETER`, `SPHEROID`, `TOWGS84`, `PRIMEM` and
//!    linear `UNIT` nodes.

use regex::Regex;

use super::{ReprojectionError, SpatialRef};

pub(super) fn resolve(wkt: &str) -> Result<SpatialRef, ReprojectionError> {
    if let Some(code) = top_level_epsg(wkt)? {
        return SpatialRef::from_epsg(code);
    }
    if let Some(proj) = proj4_extension(wkt)? {
        return SpatialRef::from_proj(&proj);
    }
    let (keyword, name) = top_level_name(wkt)?
        .ok_or_else(|| ReprojectionError::InvalidDefinition(abbreviate(wkt)))?;
    if let Some(code) = epsg_for_name(&keyword, &name)? {
        return SpatialRef::from_epsg(code);
    }
    match keyword.as_str() {
        "GEOGCS" | "PROJCS" => SpatialRef::from_proj(&lower_wkt1(&keyword, wkt)?),
        _ => Err(ReprojectionError::InvalidDefinition(format!(
            "unrecognised CRS {:?}",
            name
        ))),
    }
}

/// PROJ `+proj` names for WKT1 projection names, compared squashed.
const PROJECTIONS: &[(&str, &str)] = &[
    ("transversemercator", "tmerc"),
    ("gausskruger", "tmerc"),
    ("lambertconformalconic", "lcc"),
    ("lambertconformalconic1sp", "lcc"),
    ("lambertconformalconic2sp", "lcc"),
    ("mercator", "merc"),
    ("mercator1sp", "merc"),
    ("mercator2sp", "merc"),
    ("lambertazimuthalequalarea", "laea"),
    ("albers", "aea"),
    ("albersconicequalarea", "aea"),
    ("polarstereographic", "stere"),
    ("stereographicnorthpole", "stere"),
    ("stereographicsouthpole", "stere"),
];

/// PROJ keys for WKT1 parameter names, compared squashed.
const PARAMETERS: &[(&str, &str)] = &[
    ("falseeasting", "x_0"),
    ("falsenorthing", "y_0"),
    ("centralmeridian", "lon_0"),
    ("longitudeofcenter", "lon_0"),
    ("longitudeoforigin", "lon_0"),
    ("latitudeoforigin", "lat_0"),
    ("latitudeofcenter", "lat_0"),
    ("standardparallel1", "lat_1"),
    ("standardparallel2", "lat_2"),
    ("scalefactor", "k_0"),
];

const WGS84_SPHEROID: (f64, f64) = (6_378_137.0, 298.257_223_563);
const GRS80_SPHEROID: (f64, f64) = (6_378_137.0, 298.257_222_101);

/// PROJ string equivalent to a WKT1 geographic or projected definition.
fn lower_wkt1(keyword: &str, wkt: &str) -> Result<String, ReprojectionError> {
    let mut proj = if keyword == "PROJCS" {
        projection_params(wkt)?
    } else {
        vec![("proj".to_string(), "longlat".to_string())]
    };
    proj.extend(datum_params(wkt)?);
    if keyword == "PROJCS" {
        // The projected unit is the last UNIT; the geographic one comes first.
        if let Some(to_meter) = numbers(wkt, r#"UNIT\[\s*"[^"]*"\s*,\s*([^,\]\s]+)"#)?.last() {
            if (*to_meter - 1.0).abs() > 1e-12 {
                proj.push(("to_meter".to_string(), to_meter.to_string()));
            }
        }
    }

    Ok(proj
        .into_iter()
        .map(|(key, value)| format!("+{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" "))
}

fn projection_params(wkt: &str) -> Result<Vec<(String, String)>, ReprojectionError> {
    let method = regex(r#"PROJECTION\[\s*"([^"]+)""#)?
        .captures(wkt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReprojectionError::InvalidDefinition(abbreviate(wkt)))?;
    let proj = PROJECTIONS
        .iter()
        .find(|(name, _)| squash(name) == squash(&method))
        .map(|(_, proj)| *proj)
        .ok_or_else(|| {
            ReprojectionError::InvalidDefinition(format!("unsupported projection {:?}", method))
        })?;

    let mut params: Vec<(String, f64)> = Vec::new();
    let re = regex(r#"PARAMETER\[\s*"([^"]+)"\s*,\s*([^,\]\s]+)"#)?;
    for captures in re.captures_iter(wkt) {
        let name = squash(&captures[1]);
        let value = number(&captures[2])?;
        if let Some((_, key)) = PARAMETERS.iter().find(|(p, _)| *p == name) {
            params.push((key.to_string(), value));
        }
    }
    let mut out = vec![("proj".to_string(), proj.to_string())];
    match proj {
        "lcc" if param(&params, "lat_1").is_none() => {
            // One standard parallel, at the latitude of origin.
            let lat_0 = param(&params, "lat_0").unwrap_or(0.0);
            params.push(("lat_1".to_string(), lat_0));
        }
        "merc" => {
            for (key, _) in params.iter_mut() {
                if *key == "lat_1" {
                    *key = "lat_ts".to_string();
                }
            }
        }
        "stere" => {
            let true_scale = param(&params, "lat_1")
                .or_else(|| param(&params, "lat_0"))
                .unwrap_or(90.0);
            let pole = if true_scale < 0.0 { -90.0 } else { 90.0 };
            params.retain(|(k, _)| k != "lat_0" && k != "lat_1");
            params.push(("lat_0".to_string(), pole));
            if true_scale.abs() != 90.0 {
                params.push(("lat_ts".to_string(), true_scale));
            }
        }
        _ => {}
    }
    out.extend(params.into_iter().map(|(k, v)| (k, v.to_string())));
    Ok(out)
}

fn param(params: &[(String, f64)], key: &str) -> Option<f64> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
}

fn datum_params(wkt: &str) -> Result<Vec<(String, String)>, ReprojectionError> {
    let spheroid = regex(r#"SPHEROID\[\s*"[^"]*"\s*,\s*([^,\]\s]+)\s*,\s*([^,\]\s]+)"#)?
        .captures(wkt)
        .map(|c| Ok::<_, ReprojectionError>((number(&c[1])?, number(&c[2])?)))
        .transpose()?
        .ok_or_else(|| ReprojectionError::InvalidDefinition(abbreviate(wkt)))?;

    let same = |(a, rf): (f64, f64)| {
        (spheroid.0 - a).abs() < 1e-3 && (spheroid.1 - rf).abs() < 1e-8
    };
    let mut params = if same(WGS84_SPHEROID) {
        vec![("ellps".to_string(), "WGS84".to_string())]
    } else if same(GRS80_SPHEROID) {
        vec![("ellps".to_string(), "GRS80".to_string())]
    } else if spheroid.1 == 0.0 {
        vec![
            ("a".to_string(), spheroid.0.to_string()),
            ("b".to_string(), spheroid.0.to_string()),
        ]
    } else {
        vec![
            ("a".to_string(), spheroid.0.to_string()),
            ("rf".to_string(), spheroid.1.to_string()),
        ]
    };

    if let Some(shift) = regex(r#"TOWGS84\[([^\]]*)\]"#)?
        .captures(wkt)
        .and_then(|c| c.get(1))
    {
        let values = shift
            .as_str()
            .split(',')
            .map(number)
            .collect::<Result<Vec<_>, _>>()?;
        params.push((
            "towgs84".to_string(),
            values.iter().map(f64::to_string).collect::<Vec<_>>().join(","),
        ));
    }

    if let Some(pm) = numbers(wkt, r#"PRIMEM\[\s*"[^"]*"\s*,\s*([^,\]\s]+)"#)?.first() {
        if *pm != 0.0 {
            params.push(("pm".to_string(), pm.to_string()));
        }
    }
    Ok(params)
}

/// First capture group of every match of `pattern`, parsed as numbers.
fn numbers(wkt: &str, pattern: &str) -> Result<Vec<f64>, ReprojectionError> {
    regex(pattern)?
        .captures_iter(wkt)
        .map(|c| number(&c[1]))
        .collect()
}

fn number(text: &str) -> Result<f64, ReprojectionError> {
    text.trim()
        .parse()
        .map_err(|_| ReprojectionError::InvalidDefinition(format!("bad number {:?}", text)))
}

fn regex(pattern: &str) -> Result<Regex, ReprojectionError> {
    Regex::new(pattern).map_err(|e| ReprojectionError::InvalidDefinition(e.to_string()))
}

/// The authority code closing the outermost node, if the last node is one.
fn top_level_epsg(wkt: &str) -> Result<Option<u32>, ReprojectionError> {
    let re = regex(r#"(?i)(?:AUTHORITY\["EPSG",\s*"(\d+)"\]|ID\["EPSG",\s*"?(\d+)"?\])"#)?;
    let last = match re.captures_iter(wkt).last() {
        Some(captures) => captures,
        None => return Ok(None),
    };
    let (Some(whole), Some(code)) = (last.get(0), last.get(1).or_else(|| last.get(2))) else {
        return Ok(None);
    };
    let tail = &wkt[whole.end()..];
    if !tail.chars().all(|c| c == ']' || c.is_whitespace()) {
        return Ok(None);
    }
    Ok(code.as_str().parse().ok())
}

fn proj4_extension(wkt: &str) -> Result<Option<String>, ReprojectionError> {
    let re = regex(r#"EXTENSION\["PROJ4",\s*"([^"]+)"\]"#)?;
    Ok(re
        .captures(wkt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string()))
}

fn top_level_name(wkt: &str) -> Result<Option<(String, String)>, ReprojectionError> {
    let re = regex(r#"^\s*([A-Z]+)\s*\[\s*"([^"]*)""#)?;
    Ok(re.captures(wkt).and_then(|c| {
        Some((c.get(1)?.as_str().to_string(), c.get(2)?.as_str().to_string()))
    }))
}

/// Lowercase alphanumerics only, so `WGS 84 / UTM zone 33N` and
/// `WGS_1984_UTM_Zone_33N` compare alike.
fn squash(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn epsg_for_name(keyword: &str, name: &str) -> Result<Option<u32>, ReprojectionError> {
    let name = squash(name);
    let geographic = matches!(keyword, "GEOGCS" | "GEOGCRS" | "GEODCRS" | "GEOGRAPHICCRS");

    if geographic {
        let code = if name.contains("wgs1984") || name.contains("wgs84") {
            Some(4326)
        } else if name.contains("etrs1989") || name.contains("etrs89") {
            Some(4258)
        } else if name.contains("northamerican1983") || name.contains("nad83") {
            Some(4269)
        } else {
            None
        };
        return Ok(code);
    }

    if name.contains("webmercator") || name.contains("pseudomercator") {
        return Ok(Some(3857));
    }
    if name.contains("worldmercator") {
        return Ok(Some(3395));
    }
    if name.contains("lambert93") {
        return Ok(Some(2154));
    }
    if name.contains("britishnationalgrid") {
        return Ok(Some(27700));
    }
    if (name.contains("etrs1989") || name.contains("etrs89")) && name.contains("laea") {
        return Ok(Some(3035));
    }

    let utm = regex(r"^(wgs1984|wgs84|etrs1989|etrs89)utmzone(\d{1,2})([ns])$")?;
    if let Some(c) = utm.captures(&name) {
        let datum = &c[1];
        let zone: u32 = c[2].parse().unwrap_or(0);
        let south = &c[3] == "s";
        return Ok(match (datum.starts_with("wgs"), south) {
            (true, false) => Some(32600 + zone),
            (true, true) => Some(32700 + zone),
            (false, false) => Some(25800 + zone),
            (false, true) => None,
        });
    }
    Ok(None)
}

fn abbreviate(wkt: &str) -> String {
    let mut text: String = wkt.chars().take(60).collect();
    if wkt.chars().count() > 60 {
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CoordinateTransform;

    const WGS84_WKT1: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

    const ESRI_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const ESRI_UTM: &str = r#"PROJCS["WGS_1984_UTM_Zone_33N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    const ESRI_WEB_MERCATOR: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;

    const WKT2_UTM: &str = r#"PROJCRS["WGS 84 / UTM zone 33N",BASEGEOGCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],ID["EPSG",4326]],CONVERSION["UTM zone 33N",METHOD["Transverse Mercator",ID["EPSG",9807]]],CS[Cartesian,2],ID["EPSG",32633]]"#;

    #[test]
    fn test_wkt1_with_authority() {
        let srs = resolve(WGS84_WKT1).unwrap();
        assert_eq!(srs, SpatialRef::wgs84());
        assert_eq!(srs.epsg(), Some(4326));
    }

    #[test]
    fn test_wkt2_id() {
        let srs = resolve(WKT2_UTM).unwrap();
        assert_eq!(srs.epsg(), Some(32633));
    }

    #[test]
    fn test_esri_names() {
        assert_eq!(resolve(ESRI_WGS84).unwrap(), SpatialRef::wgs84());
        assert_eq!(resolve(ESRI_UTM).unwrap().epsg(), Some(32633));
        assert_eq!(resolve(ESRI_WEB_MERCATOR).unwrap().epsg(), Some(3857));
    }

    #[test]
    fn test_nested_authority_is_not_top_level() {
        // Only the datum carries an authority; the CRS itself does not.
        let wkt = r#"PROJCS["Somewhere",GEOGCS["X",DATUM["D",SPHEROID["S",1,1],AUTHORITY["EPSG","6326"]]],PROJECTION["Foo"]]"#;
        assert_eq!(top_level_epsg(wkt).unwrap(), None);
        assert!(matches!(
            resolve(wkt),
            Err(ReprojectionError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_proj4_extension() {
        let wkt = r#"PROJCS["Custom",GEOGCS["WGS 84"],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +nadgrids=@null +no_defs"]]"#;
        let srs = resolve(wkt).unwrap();
        assert_eq!(srs.param("proj"), Some("merc"));
    }

    const CUSTOM_LCC: &str = r#"PROJCS["custom",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-96.0],PARAMETER["Standard_Parallel_1",33.0],PARAMETER["Standard_Parallel_2",45.0],PARAMETER["Latitude_Of_Origin",39.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_custom_lambert_conformal_conic() {
        let srs = resolve(CUSTOM_LCC).unwrap();
        assert_eq!(srs.epsg(), None);
        assert_eq!(srs.param("proj"), Some("lcc"));
        assert_eq!(srs.param("lon_0"), Some("-96"));
        assert_eq!(srs.param("lat_0"), Some("39"));
        assert_eq!(srs.param("lat_1"), Some("33"));
        assert_eq!(srs.param("lat_2"), Some("45"));
        assert_eq!(srs.param("ellps"), Some("WGS84"));
        assert!(!srs.is_geographic());

        let wgs84 = SpatialRef::wgs84();
        let forward = CoordinateTransform::new(&wgs84, &srs).unwrap();
        let inverse = CoordinateTransform::new(&srs, &wgs84).unwrap();

        let (x, y) = forward.transform(-96.0, 39.0).unwrap();
        assert!(x.abs() < 1e-3 && y.abs() < 1e-3, "origin at ({}, {})", x, y);

        let (lon, lat) = inverse.transform(250_000.0, -120_000.0).unwrap();
        let (x, y) = forward.transform(lon, lat).unwrap();
        assert!((x - 250_000.0).abs() < 1e-3, "x = {}", x);
        assert!((y + 120_000.0).abs() < 1e-3, "y = {}", y);
    }

    #[test]
    fn test_custom_projection_details() {
        let feet = r#"PROJCS["NAD_1983_StatePlane_Custom_FIPS_Feet",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",984250.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-120.5],PARAMETER["Scale_Factor",0.9999],PARAMETER["Latitude_Of_Origin",31.0],UNIT["Foot_US",0.3048006096012192]]"#;
        let srs = resolve(feet).unwrap();
        assert_eq!(srs.param("proj"), Some("tmerc"));
        assert_eq!(srs.param("ellps"), Some("GRS80"));
        assert_eq!(srs.param("k_0"), Some("0.9999"));
        assert_eq!(srs.param("x_0"), Some("984250"));
        assert!(srs.param("to_meter").unwrap().starts_with("0.3048"));

        let south_pole = r#"PROJCS["Antarctic custom",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Stereographic_South_Pole"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",-71.0],UNIT["Meter",1.0]]"#;
        let srs = resolve(south_pole).unwrap();
        assert_eq!(srs.param("proj"), Some("stere"));
        assert_eq!(srs.param("lat_0"), Some("-90"));
        assert_eq!(srs.param("lat_ts"), Some("-71"));
    }

    #[test]
    fn test_custom_geographic_spheroid() {
        let clarke = r#"GEOGCS["Local datum",DATUM["D_Local",SPHEROID["Clarke_1866",6378206.4,294.9786982]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        let srs = resolve(clarke).unwrap();
        assert!(srs.is_geographic());
        assert_eq!(srs.param("a"), Some("6378206.4"));
        assert_eq!(srs.param("rf"), Some("294.9786982"));
        assert_ne!(srs, SpatialRef::wgs84());
    }

    #[test]
    fn test_unsupported_projection_is_named() {
        let wkt = CUSTOM_LCC.replace("Lambert_Conformal_Conic", "Bonne");
        match resolve(&wkt) {
            Err(ReprojectionError::InvalidDefinition(message)) => {
                assert!(message.contains("Bonne"), "{}", message)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash("WGS 84 / UTM zone 33N"), "wgs84utmzone33n");
        assert_eq!(squash("WGS_1984_UTM_Zone_33N"), "wgs1984utmzone33n");
    }
}
