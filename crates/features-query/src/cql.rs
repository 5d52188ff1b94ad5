//! CQL filter translation.
//!
//! CQL-JSON expression trees are translated by recursive descent into a
//! [`FilterExpression`]. The text encoding is limited to
//! `INTERSECTS(<field>,<WKT>)` and `WITHIN(<field>,<WKT>)`, which are
//! rewritten to their JSON form first.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use features_protocol::{FeaturesError, Geometry};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::coerce::{coerce_json, coerce_json_list};
use crate::datetime::parse_bound;
use crate::filter::{ComparisonOp, FilterExpression, PropertyNamespace};
use crate::wkt;

const TEXT_OPERATORS: &[&str] = &["INTERSECTS", "WITHIN"];

/// Filter encodings accepted in `filter-lang`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterLang {
    #[default]
    CqlJson,
    CqlText,
}

impl FromStr for FilterLang {
    type Err = FeaturesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cql-json" => Ok(FilterLang::CqlJson),
            "cql-text" => Ok(FilterLang::CqlText),
            other => Err(FeaturesError::bad_request(format!(
                "Unsupported filter language {}, only cql-json and cql-text are supported",
                other
            ))),
        }
    }
}

/// Translates CQL bodies for one backend namespace.
#[derive(Debug, Clone, Copy)]
pub struct CqlTranslator {
    namespace: PropertyNamespace,
    now: DateTime<Utc>,
}

impl CqlTranslator {
    /// `now` anchors durations used as temporal operands.
    pub fn new(namespace: PropertyNamespace, now: DateTime<Utc>) -> Self {
        Self { namespace, now }
    }

    /// Translate a filter in the given encoding.
    ///
    /// For `cql-text` the body must be a JSON string holding the expression.
    pub fn translate(&self, body: &Value, lang: FilterLang) -> Result<FilterExpression, FeaturesError> {
        match lang {
            FilterLang::CqlJson => self.translate_json(body),
            FilterLang::CqlText => match body {
                Value::String(text) => self.translate_text(text),
                _ => Err(FeaturesError::bad_request("Invalid CQL text expression")),
            },
        }
    }

    /// Translate the supported CQL-text subset.
    pub fn translate_text(&self, text: &str) -> Result<FilterExpression, FeaturesError> {
        let json = text_to_json(text)?;
        debug!(filter = %json, "Converted CQL expression from text");
        self.translate_json(&json)
    }

    /// Translate a CQL-JSON expression.
    ///
    /// Operator families are evaluated independently (logical, comparison,
    /// temporal, spatial); several results are combined with AND and an
    /// object with no known operator yields an empty conjunction.
    pub fn translate_json(&self, body: &Value) -> Result<FilterExpression, FeaturesError> {
        let expression = body
            .as_object()
            .ok_or_else(|| FeaturesError::bad_request("Invalid CQL expression, a JSON object is expected"))?;

        let mut results = Vec::new();
        self.logical(expression, &mut results)?;
        self.comparison(expression, &mut results)?;
        if let Some(temporal) = self.temporal(expression)? {
            results.push(temporal);
        }
        if let Some(spatial) = self.spatial(expression)? {
            results.push(spatial);
        }

        Ok(if results.len() == 1 {
            results.remove(0)
        } else {
            FilterExpression::And(results)
        })
    }

    fn logical(&self, expression: &Map<String, Value>, out: &mut Vec<FilterExpression>) -> Result<(), FeaturesError> {
        for operator in ["and", "or"] {
            if let Some(operands) = expression.get(operator) {
                let list = operands.as_array().ok_or_else(|| {
                    FeaturesError::bad_request(format!("Invalid {} operator specification", operator))
                })?;
                let items = list
                    .iter()
                    .map(|sub| self.translate_json(sub))
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(if operator == "and" {
                    FilterExpression::And(items)
                } else {
                    FilterExpression::Or(items)
                });
            }
        }

        if let Some(operands) = expression.get("not") {
            out.push(self.not(operands)?);
        }
        Ok(())
    }

    fn not(&self, operands: &Value) -> Result<FilterExpression, FeaturesError> {
        let invalid = || FeaturesError::bad_request("Invalid not operator specification");
        let sub = match operands {
            Value::Array(list) if list.len() == 1 => &list[0],
            Value::Object(_) => operands,
            _ => return Err(invalid()),
        };

        let inner = self.translate_json(sub)?;
        let field = {
            let fields = inner.target_fields();
            if fields.len() != 1 {
                return Err(invalid());
            }
            fields.into_iter().next().map(str::to_string).ok_or_else(invalid)?
        };
        Ok(FilterExpression::Not {
            field,
            inner: Box::new(inner),
        })
    }

    fn comparison(&self, expression: &Map<String, Value>, out: &mut Vec<FilterExpression>) -> Result<(), FeaturesError> {
        for (name, op) in ComparisonOp::ALL {
            if let Some(operands) = expression.get(name) {
                let invalid = || FeaturesError::bad_request("Invalid comparison operator specification");
                let field = operand_property(operands.get(0)).ok_or_else(invalid)?;
                let value = operands.get(1).ok_or_else(invalid)?;
                out.push(FilterExpression::comparison(op, self.namespace.qualify(field), coerce_json(value)));
            }
        }

        if let Some(between) = expression.get("between") {
            let invalid = || FeaturesError::bad_request("Invalid between operator specification");
            let field = operand_property(between.get("value")).ok_or_else(invalid)?;
            let lower = between.get("lower").ok_or_else(invalid)?;
            let upper = between.get("upper").ok_or_else(invalid)?;
            out.push(FilterExpression::Between {
                field: self.namespace.qualify(field),
                lower: coerce_json(lower),
                upper: coerce_json(upper),
            });
        }

        if let Some(within_list) = expression.get("in") {
            let invalid = || FeaturesError::bad_request("Invalid in operator specification");
            let field = operand_property(within_list.get("value")).ok_or_else(invalid)?;
            let list = within_list.get("list").ok_or_else(invalid)?;
            out.push(FilterExpression::In {
                field: self.namespace.qualify(field),
                values: coerce_json_list(list),
            });
        }

        if let Some(is_null) = expression.get("isNull") {
            let target = match is_null {
                Value::Array(list) => list.first(),
                other => Some(other),
            };
            let field = operand_property(target)
                .ok_or_else(|| FeaturesError::bad_request("Invalid isNull operator specification"))?;
            out.push(FilterExpression::IsNull {
                field: self.namespace.qualify(field),
            });
        }
        Ok(())
    }

    fn temporal(&self, expression: &Map<String, Value>) -> Result<Option<FilterExpression>, FeaturesError> {
        if let Some(operands) = expression.get("before") {
            let (field, value) = self.temporal_operands("before", operands)?;
            return Ok(Some(FilterExpression::Before { field, value }));
        }
        if let Some(operands) = expression.get("after") {
            let (field, value) = self.temporal_operands("after", operands)?;
            return Ok(Some(FilterExpression::After { field, value }));
        }
        if let Some(operands) = expression.get("during") {
            let invalid = || FeaturesError::bad_request("Invalid during operator specification");
            let field = operand_property(operands.get(0)).ok_or_else(invalid)?;
            let bounds = operands.get(1).ok_or_else(invalid)?;
            let lower = self.instant(bounds.get(0)).ok_or_else(invalid)??;
            let upper = self.instant(bounds.get(1)).ok_or_else(invalid)??;
            return Ok(Some(FilterExpression::During {
                field: self.namespace.qualify(field),
                lower,
                upper,
            }));
        }
        Ok(None)
    }

    fn temporal_operands(&self, operator: &str, operands: &Value) -> Result<(String, DateTime<Utc>), FeaturesError> {
        let invalid = || FeaturesError::bad_request(format!("Invalid {} operator specification", operator));
        let field = operand_property(operands.get(0)).ok_or_else(invalid)?;
        let value = self.instant(operands.get(1)).ok_or_else(invalid)??;
        Ok((self.namespace.qualify(field), value))
    }

    /// Resolve a temporal operand; `None` when absent or open.
    fn instant(&self, operand: Option<&Value>) -> Option<Result<DateTime<Utc>, FeaturesError>> {
        let raw = operand?.as_str()?;
        match parse_bound(raw) {
            Ok(Some(value)) => Some(Ok(value.resolve(self.now))),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }

    fn spatial(&self, expression: &Map<String, Value>) -> Result<Option<FilterExpression>, FeaturesError> {
        for operator in ["intersects", "within"] {
            if let Some(operands) = expression.get(operator) {
                let invalid = || FeaturesError::bad_request("Invalid spatial operator specification");
                let field = operand_property(operands.get(0)).unwrap_or("geometry");
                let geometry: Geometry = operands
                    .get(1)
                    .and_then(|g| serde_json::from_value(g.clone()).ok())
                    .ok_or_else(invalid)?;
                let field = self.namespace.qualify(field);
                debug!(%field, geometry = geometry.type_name(), "Processed CQL {} geometry", operator);
                return Ok(Some(if operator == "intersects" {
                    FilterExpression::Intersects { field, geometry }
                } else {
                    FilterExpression::Within { field, geometry }
                }));
            }
        }
        Ok(None)
    }
}

/// `{ "property": "<name>" }` operand.
fn operand_property(operand: Option<&Value>) -> Option<&str> {
    operand?
        .get("property")?
        .as_str()
        .filter(|name| !name.is_empty())
}

/// Rewrite `OPERATOR(<field>,<WKT>)` into its CQL-JSON form.
fn text_to_json(text: &str) -> Result<Value, FeaturesError> {
    let text = text.trim();
    let upper = text.to_uppercase();

    for operator in TEXT_OPERATORS {
        let prefix = format!("{}(", operator);
        if !upper.starts_with(&prefix) {
            continue;
        }
        let invalid = || FeaturesError::bad_request(format!("Invalid {} operator specification", operator));
        let inner = text[prefix.len()..].strip_suffix(')').ok_or_else(invalid)?;
        let (field, geometry) = inner.split_once(',').ok_or_else(invalid)?;
        let field = field.trim();
        if field.is_empty() {
            return Err(invalid());
        }
        let geometry = wkt::parse(geometry).map_err(|e| {
            FeaturesError::bad_request(format!("Invalid WKT geometry specification {}: {}", geometry.trim(), e))
        })?;
        let mut expression = Map::new();
        expression.insert(operator.to_lowercase(), json!([{ "property": field }, geometry]));
        return Ok(Value::Object(expression));
    }

    Err(FeaturesError::bad_request(
        "Unsupported CQL text expression, only INTERSECTS and WITHIN are supported",
    ))
}
