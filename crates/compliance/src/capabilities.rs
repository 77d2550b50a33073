//! Optional external abilities used by the tool compatibility checks.
//!
//! Capabilities are resolved once into a [`Capabilities`] set. A check that
//! needs a missing capability reports it through [`skipped`], so every skip
//! looks the same in the report.

use std::fmt;
use std::sync::Arc;

use mlcast_common::Variable;
use thiserror::Error;

use crate::report::{Finding, Status};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Failed(String),
}

/// Named capability, used in skip findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    WktParsing,
    RasterRoundTrip,
    CoordinateTransform,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::WktParsing => "WKT parsing",
            Capability::RasterRoundTrip => "raster round-trip",
            Capability::CoordinateTransform => "coordinate transform",
        };
        f.write_str(name)
    }
}

/// Broad class of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Projected,
    Geographic,
    Other,
}

/// What a WKT parser learned about a CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsInfo {
    pub kind: CrsKind,
    pub name: Option<String>,
    /// Projection method, for projected systems.
    pub projection: Option<String>,
    /// `AUTHORITY:CODE`, e.g. `EPSG:3035`.
    pub authority: Option<String>,
    pub has_bbox: bool,
}

pub trait WktParser: Send + Sync {
    fn parse(&self, wkt: &str) -> Result<CrsInfo, CapabilityError>;
}

/// A 2-D slice handed to a raster round-trip oracle.
#[derive(Debug, Clone, Copy)]
pub struct RasterSample<'a> {
    pub variable: &'a Variable,
    pub wkt: &'a str,
    pub x: Option<&'a [f64]>,
    pub y: Option<&'a [f64]>,
}

/// Georeferencing that survived a raster export and re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTripOutcome {
    pub geotransform: bool,
    pub projection: bool,
}

pub trait RasterRoundTrip: Send + Sync {
    fn round_trip(&self, sample: &RasterSample<'_>) -> Result<RoundTripOutcome, CapabilityError>;
}

pub trait CoordinateTransform: Send + Sync {
    /// Transform projected `(x, y)` points to `(lon, lat)` degrees.
    fn to_lon_lat(&self, crs: &CrsInfo, wkt: &str, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, CapabilityError>;
}

/// The set of capabilities available to this process.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub wkt: Option<Arc<dyn WktParser>>,
    pub raster: Option<Arc<dyn RasterRoundTrip>>,
    pub transform: Option<Arc<dyn CoordinateTransform>>,
}

impl Capabilities {
    /// Capabilities available without external libraries: the structural
    /// WKT parser only.
    pub fn detect() -> Self {
        Self {
            wkt: Some(Arc::new(StructuralWktParser)),
            raster: None,
            transform: None,
        }
    }

    /// No capabilities at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_wkt_parser(mut self, parser: Arc<dyn WktParser>) -> Self {
        self.wkt = Some(parser);
        self
    }

    pub fn with_raster_round_trip(mut self, oracle: Arc<dyn RasterRoundTrip>) -> Self {
        self.raster = Some(oracle);
        self
    }

    pub fn with_coordinate_transform(mut self, transform: Arc<dyn CoordinateTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::WktParsing => self.wkt.is_some(),
            Capability::RasterRoundTrip => self.raster.is_some(),
            Capability::CoordinateTransform => self.transform.is_some(),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("wkt", &self.wkt.is_some())
            .field("raster", &self.raster.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// The uniform finding for a requirement that needs an absent capability.
pub fn skipped(section: &str, requirement: &str, capability: Capability) -> Finding {
    let mut finding = Finding::new(
        section,
        requirement,
        Status::Warning,
        format!("{requirement} skipped: {capability} is not available"),
    );
    finding.skipped = true;
    finding
}

// ============================================================================
// Structural WKT parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum WktValue {
    Node(WktNode),
    Quoted(String),
    Bare(String),
}

#[derive(Debug, Clone, PartialEq)]
struct WktNode {
    keyword: String,
    children: Vec<WktValue>,
}

impl WktNode {
    fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.children.iter().find_map(|c| match c {
            WktValue::Node(n) if keywords.contains(&n.keyword.as_str()) => Some(n),
            _ => None,
        })
    }

    fn first_text(&self) -> Option<String> {
        self.children.iter().find_map(|c| match c {
            WktValue::Quoted(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn contains(&self, keyword: &str) -> bool {
        self.children.iter().any(|c| match c {
            WktValue::Node(n) => n.keyword == keyword || n.contains(keyword),
            _ => false,
        })
    }
}

/// Parses WKT1 and WKT2 syntax into a node tree and classifies the root.
///
/// It checks structure only: keywords, brackets, quoting. It does not
/// validate datums or projection parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralWktParser;

struct WktReader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> WktReader<'a> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn node(&mut self, keyword: String) -> Result<WktNode, CapabilityError> {
        let close = match self.chars.next() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(CapabilityError::Parse(format!("expected '[' after {keyword}"))),
        };
        let mut children = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(c) if *c == close && children.is_empty() => {
                    self.chars.next();
                    break;
                }
                None => return Err(CapabilityError::Parse(format!("unterminated {keyword}"))),
                _ => {}
            }
            children.push(self.value()?);
            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some(c) if c == close => break,
                Some(c) => return Err(CapabilityError::Parse(format!("unexpected '{c}' in {keyword}"))),
                None => return Err(CapabilityError::Parse(format!("unterminated {keyword}"))),
            }
        }
        Ok(WktNode { keyword, children })
    }

    fn value(&mut self) -> Result<WktValue, CapabilityError> {
        self.skip_ws();
        if self.chars.peek() == Some(&'"') {
            self.chars.next();
            let mut text = String::new();
            loop {
                match self.chars.next() {
                    Some('"') if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        text.push('"');
                    }
                    Some('"') => return Ok(WktValue::Quoted(text)),
                    Some(c) => text.push(c),
                    None => return Err(CapabilityError::Parse("unterminated string".to_string())),
                }
            }
        }
        let mut word = String::new();
        while let Some(c) = self.chars.peek() {
            if matches!(c, '[' | ']' | '(' | ')' | ',' | '"') || c.is_whitespace() {
                break;
            }
            word.push(*c);
            self.chars.next();
        }
        if word.is_empty() {
            return Err(CapabilityError::Parse("empty value".to_string()));
        }
        self.skip_ws();
        if matches!(self.chars.peek(), Some('[') | Some('(')) {
            let keyword = word.to_uppercase();
            return self.node(keyword).map(WktValue::Node);
        }
        Ok(WktValue::Bare(word))
    }
}

fn classify(root: &WktNode) -> CrsKind {
    match root.keyword.as_str() {
        "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => CrsKind::Projected,
        "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" | "GEODCRS" | "GEODETICCRS" => CrsKind::Geographic,
        "BOUNDCRS" => root
            .child(&["SOURCECRS"])
            .and_then(|s| {
                s.children.iter().find_map(|c| match c {
                    WktValue::Node(n) => Some(classify(n)),
                    _ => None,
                })
            })
            .unwrap_or(CrsKind::Other),
        _ => CrsKind::Other,
    }
}

fn authority(root: &WktNode) -> Option<String> {
    let node = root.child(&["AUTHORITY", "ID"])?;
    let parts: Vec<String> = node
        .children
        .iter()
        .filter_map(|c| match c {
            WktValue::Quoted(s) | WktValue::Bare(s) => Some(s.clone()),
            WktValue::Node(_) => None,
        })
        .take(2)
        .collect();
    match parts.as_slice() {
        [name, code] => Some(format!("{name}:{code}")),
        _ => None,
    }
}

impl WktParser for StructuralWktParser {
    fn parse(&self, wkt: &str) -> Result<CrsInfo, CapabilityError> {
        let mut reader = WktReader {
            chars: wkt.chars().peekable(),
        };
        let root = match reader.value()? {
            WktValue::Node(node) => node,
            _ => return Err(CapabilityError::Parse("WKT must start with a keyword".to_string())),
        };
        reader.skip_ws();
        if reader.chars.next().is_some() {
            return Err(CapabilityError::Parse("trailing characters after WKT".to_string()));
        }

        let projection = root
            .child(&["PROJECTION"])
            .or_else(|| root.child(&["CONVERSION"]).and_then(|c| c.child(&["METHOD", "PROJECTION"])))
            .and_then(WktNode::first_text);

        Ok(CrsInfo {
            kind: classify(&root),
            name: root.first_text(),
            projection,
            authority: authority(&root),
            has_bbox: root.contains("BBOX"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAEA: &str = r#"PROJCRS["ETRS89-extended / LAEA Europe",BASEGEOGCRS["ETRS89",DATUM["European Terrestrial Reference System 1989",ELLIPSOID["GRS 1980",6378137,298.257222101]]],CONVERSION["Europe Equal Area 2001",METHOD["Lambert Azimuthal Equal Area",ID["EPSG",9820]]],CS[Cartesian,2],USAGE[SCOPE["Statistical mapping."],BBOX[27.6,-35.58,81.91,44.83]],ID["EPSG",3035]]"#;
    const WGS84: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;

    #[test]
    fn test_parse_wkt2_projected() {
        let info = StructuralWktParser.parse(LAEA).unwrap();
        assert_eq!(info.kind, CrsKind::Projected);
        assert_eq!(info.name.as_deref(), Some("ETRS89-extended / LAEA Europe"));
        assert_eq!(info.projection.as_deref(), Some("Lambert Azimuthal Equal Area"));
        assert_eq!(info.authority.as_deref(), Some("EPSG:3035"));
        assert!(info.has_bbox);
    }

    #[test]
    fn test_parse_wkt1_geographic() {
        let info = StructuralWktParser.parse(WGS84).unwrap();
        assert_eq!(info.kind, CrsKind::Geographic);
        assert_eq!(info.authority.as_deref(), Some("EPSG:4326"));
        assert!(!info.has_bbox);
        assert!(info.projection.is_none());
    }

    #[test]
    fn test_other_kind() {
        let info = StructuralWktParser.parse(r#"VERTCRS["EGM2008 height",VDATUM["EGM2008"]]"#).unwrap();
        assert_eq!(info.kind, CrsKind::Other);
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "not wkt",
            r#"PROJCRS["broken",BASEGEOGCRS["ETRS89""#,
            r#"GEOGCS["WGS 84"]]"#,
            r#"GEOGCS["WGS 84",]"#,
        ] {
            assert!(StructuralWktParser.parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_quoted_quotes() {
        let info = StructuralWktParser.parse(r#"GEOGCS["say ""hi""",DATUM["d"]]"#).unwrap();
        assert_eq!(info.name.as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_detect_and_skip() {
        let caps = Capabilities::detect();
        assert!(caps.has(Capability::WktParsing));
        assert!(!caps.has(Capability::RasterRoundTrip));
        assert!(!Capabilities::none().has(Capability::WktParsing));

        let f = skipped("6.1", "GDAL roundtrip", Capability::RasterRoundTrip);
        assert_eq!(f.status, Status::Warning);
        assert!(f.skipped);
        assert_eq!(f.detail, "GDAL roundtrip skipped: raster round-trip is not available");
    }
}
