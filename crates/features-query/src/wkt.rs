//! Well-Known Text geometry parsing for the CQL-text spatial operators.
//!
//! Accepts POINT, MULTIPOINT, LINESTRING, MULTILINESTRING, POLYGON and
//! MULTIPOLYGON, with an optional Z, M or ZM dimension tag. Extra
//! ordinates are kept on each position.

use features_protocol::{Geometry, Position};
use thiserror::Error;

/// Errors that can occur when parsing WKT.
#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    /// Structural error (parentheses, separators).
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),

    /// Invalid coordinate value.
    #[error("Invalid coordinate value: {0}")]
    InvalidCoordinate(String),

    /// Geometry type we do not handle.
    #[error("Unsupported WKT geometry type: {0}")]
    UnsupportedType(String),
}

/// Parenthesized coordinate tree before it is shaped into a geometry.
#[derive(Debug)]
enum Node {
    Position(Position),
    List(Vec<Node>),
}

/// Parse a WKT string into a GeoJSON geometry.
pub fn parse(wkt: &str) -> Result<Geometry, WktError> {
    let wkt = wkt.trim();
    let open = wkt
        .find('(')
        .ok_or_else(|| WktError::InvalidWkt(wkt.to_string()))?;

    let header = wkt[..open].to_uppercase();
    let mut tokens = header.split_whitespace();
    let kind = tokens
        .next()
        .ok_or_else(|| WktError::InvalidWkt(wkt.to_string()))?
        .to_string();
    match tokens.next() {
        None | Some("Z") | Some("M") | Some("ZM") => {}
        Some(other) => return Err(WktError::InvalidWkt(format!("unexpected token {}", other))),
    }

    let mut parser = Parser { input: wkt.as_bytes(), pos: open };
    let tree = parser.list()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(WktError::InvalidWkt(format!("trailing content in {}", wkt)));
    }

    match kind.as_str() {
        "POINT" => {
            let mut positions = positions(tree)?;
            if positions.len() != 1 {
                return Err(WktError::InvalidWkt("POINT requires exactly one position".into()));
            }
            Ok(Geometry::Point(positions.remove(0)))
        }
        "MULTIPOINT" => Ok(Geometry::MultiPoint(multipoint(tree)?)),
        "LINESTRING" => Ok(Geometry::LineString(positions(tree)?)),
        "MULTILINESTRING" => Ok(Geometry::MultiLineString(lines(tree)?)),
        "POLYGON" => Ok(Geometry::Polygon(rings(tree)?)),
        "MULTIPOLYGON" => Ok(Geometry::MultiPolygon(
            children(tree)?.into_iter().map(rings).collect::<Result<_, _>>()?,
        )),
        other => Err(WktError::UnsupportedType(other.to_string())),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn list(&mut self) -> Result<Node, WktError> {
        self.skip_ws();
        if self.peek() != Some(b'(') {
            return Err(WktError::InvalidWkt(format!("expected '(' at {}", self.pos)));
        }
        self.pos += 1;

        let mut items = Vec::new();
        loop {
            self.skip_ws();
            let item = if self.peek() == Some(b'(') {
                self.list()?
            } else {
                self.position()?
            };
            items.push(item);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(Node::List(items));
                }
                _ => return Err(WktError::InvalidWkt(format!("unterminated list at {}", self.pos))),
            }
        }
    }

    fn position(&mut self) -> Result<Node, WktError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b',' || c == b')' || c == b'(' {
                break;
            }
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]);
        let ordinates = text
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| WktError::InvalidCoordinate(v.to_string()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if ordinates.len() < 2 || ordinates.len() > 4 {
            return Err(WktError::InvalidCoordinate(text.trim().to_string()));
        }
        Ok(Node::Position(ordinates))
    }
}

fn children(node: Node) -> Result<Vec<Node>, WktError> {
    match node {
        Node::List(items) => Ok(items),
        Node::Position(_) => Err(WktError::InvalidWkt("expected a nested list".into())),
    }
}

fn positions(node: Node) -> Result<Vec<Position>, WktError> {
    children(node)?
        .into_iter()
        .map(|item| match item {
            Node::Position(p) => Ok(p),
            Node::List(_) => Err(WktError::InvalidWkt("unexpected nested list".into())),
        })
        .collect()
}

/// MULTIPOINT accepts both `(1 2, 3 4)` and `((1 2), (3 4))`.
fn multipoint(node: Node) -> Result<Vec<Position>, WktError> {
    children(node)?
        .into_iter()
        .map(|item| match item {
            Node::Position(p) => Ok(p),
            list => {
                let mut inner = positions(list)?;
                if inner.len() != 1 {
                    return Err(WktError::InvalidWkt("MULTIPOINT member must hold one position".into()));
                }
                Ok(inner.remove(0))
            }
        })
        .collect()
}

fn lines(node: Node) -> Result<Vec<Vec<Position>>, WktError> {
    children(node)?.into_iter().map(positions).collect()
}

fn rings(node: Node) -> Result<Vec<Vec<Position>>, WktError> {
    let rings = lines(node)?;
    for ring in &rings {
        if ring.len() < 4 || ring.first() != ring.last() {
            return Err(WktError::InvalidWkt("polygon rings must be closed with at least 4 positions".into()));
        }
    }
    Ok(rings)
}
