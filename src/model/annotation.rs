//! Vertex annotations for phylogenetic trees.
//!
//! BEAST-style tree files attach data to vertices in `[&key=value,...]`
//! blocks: discrete states (`location="Hubei"`), rates, and nested
//! Markov-jump histories (`history={{2.5,A,B},{1.0,B,C}}`). [Annotations]
//! stores the parsed [AnnotationValue]s per key and vertex index.

use crate::model::VertexIndex;
use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// ANNOTATIONS
// =#========================================================================#=
/// Vertex annotations for multiple keys, stored column-wise per key.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    annotations: HashMap<String, Vec<Option<AnnotationValue>>>,
    num_vertices: usize,
}

impl Annotations {
    /// Creates empty annotations sized for `num_vertices` vertices.
    pub fn new(num_vertices: usize) -> Self {
        Annotations {
            num_vertices,
            annotations: HashMap::new(),
        }
    }

    /// Returns the values for `key`, one slot per vertex.
    pub fn get_all_for_key(&self, key: &str) -> Option<&[Option<AnnotationValue>]> {
        self.annotations.get(key).map(Vec::as_slice)
    }

    /// Returns the value of `key` at `vertex_index`, if any.
    pub fn get(&self, key: &str, vertex_index: VertexIndex) -> Option<&AnnotationValue> {
        self.annotations
            .get(key)
            .and_then(|column| column.get(vertex_index))
            .and_then(Option::as_ref)
    }

    /// Returns whether any vertex carries `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.annotations.contains_key(key)
    }

    /// Returns the annotation keys present, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }

    /// Stores `value` for `key` at `vertex_index`, growing the column if needed.
    pub fn add(&mut self, key: String, vertex_index: VertexIndex, value: AnnotationValue) {
        let num_vertices = self.num_vertices.max(vertex_index + 1);
        let column = self
            .annotations
            .entry(key)
            .or_insert_with(|| vec![None; num_vertices]);
        if column.len() <= vertex_index {
            column.resize(vertex_index + 1, None);
        }
        column[vertex_index] = Some(value);
    }

    /// Pads or truncates every column to `num_vertices` slots.
    pub(crate) fn resize(&mut self, num_vertices: usize) {
        self.num_vertices = num_vertices;
        for column in self.annotations.values_mut() {
            column.resize(num_vertices, None);
        }
    }
}

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================#=
/// A parsed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// For unquoted numbers; `text` is kept as written so that numeric
    /// state labels like `01` or `1.0` are not normalised
    Number { value: f64, text: String },
    /// For quoted or bare-word strings
    String(String),
    /// For brace-delimited lists `{a,b,...}`, possibly nested
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    /// Reads an unquoted scalar: a [Number](AnnotationValue::Number) if
    /// `raw` parses as one, a [String](AnnotationValue::String) otherwise.
    pub fn from_unquoted(raw: String) -> Self {
        match raw.parse::<f64>() {
            Ok(value) => AnnotationValue::Number { value, text: raw },
            Err(_) => AnnotationValue::String(raw),
        }
    }

    /// Returns the numeric value of a number, or of a string holding one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Number { value, .. } => Some(*value),
            AnnotationValue::String(s) => s.trim().parse().ok(),
            AnnotationValue::Array(_) => None,
        }
    }

    /// Returns the value as an integer if it is a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AnnotationValue::Number { value, text } => text
                .parse()
                .ok()
                .or_else(|| (value.fract() == 0.0).then_some(*value as i64)),
            AnnotationValue::String(s) => s.trim().parse().ok(),
            AnnotationValue::Array(_) => None,
        }
    }

    /// Returns the elements of an array value.
    pub fn as_array(&self) -> Option<&[AnnotationValue]> {
        match self {
            AnnotationValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Renders a scalar as a state label, exactly as it was written.
    /// Arrays have no label form.
    pub fn as_label(&self) -> Option<String> {
        match self {
            AnnotationValue::Array(_) => None,
            scalar => Some(scalar.to_string()),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Number { text, .. } => f.write_str(text),
            AnnotationValue::String(s) => f.write_str(s),
            AnnotationValue::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        AnnotationValue::Number { value, text: value.to_string() }
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Number { value: value as f64, text: value.to_string() }
    }
}

impl From<String> for AnnotationValue {
    fn from(v: String) -> Self {
        AnnotationValue::String(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}

impl From<Vec<AnnotationValue>> for AnnotationValue {
    fn from(v: Vec<AnnotationValue>) -> Self {
        AnnotationValue::Array(v)
    }
}
