//! Operator attributes.
//!
//! Each relation carries the attributes of the operator call it was
//! generated for (`axis`, `newshape`, ...). The bag is shared between
//! clones of a relation and never mutated once built.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tyrel_arith::IndexExpr;
use tyrel_types::DataType;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// An integer.
    Int(i64),
    /// A flag.
    Bool(bool),
    /// A string.
    Str(String),
    /// An element type.
    DType(DataType),
    /// A list of integers.
    Ints(Vec<i64>),
    /// A list of dimension expressions.
    Exprs(Vec<IndexExpr>),
}

/// An ordered attribute bag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attrs(Arc<IndexMap<String, AttrValue>>);

impl Attrs {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bag with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        Arc::make_mut(&mut self.0).insert(key.into(), value);
        self
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    /// An integer attribute.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// A boolean attribute.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// A string attribute.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// An element type attribute.
    #[must_use]
    pub fn get_dtype(&self, key: &str) -> Option<DataType> {
        match self.get(key)? {
            AttrValue::DType(v) => Some(*v),
            _ => None,
        }
    }

    /// An integer list attribute.
    #[must_use]
    pub fn get_ints(&self, key: &str) -> Option<&[i64]> {
        match self.get(key)? {
            AttrValue::Ints(v) => Some(v),
            _ => None,
        }
    }

    /// A dimension list; integer lists are widened to literal dimensions.
    #[must_use]
    pub fn get_exprs(&self, key: &str) -> Option<Vec<IndexExpr>> {
        match self.get(key)? {
            AttrValue::Exprs(v) => Some(v.clone()),
            AttrValue::Ints(v) => Some(v.iter().copied().map(IndexExpr::lit).collect()),
            _ => None,
        }
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
