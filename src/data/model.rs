use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// AttrValue – a single attribute value or coordinate sample
// ---------------------------------------------------------------------------

/// A dynamically-typed value mirroring the attribute types of self-describing
/// array files. Coordinate samples use the same type.
///
/// Equality and ordering are numeric across `Integer` and `Float`, so an axis
/// stored as `[-90, 90]` in one file equals `[-90.0, 90.0]` in another.
#[derive(Debug, Clone)]
pub enum AttrValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Array-valued attributes such as `valid_range`.
    List(Vec<AttrValue>),
    Null,
}

// -- Manual Eq/Ord: parts are compared and sorted by coordinate samples --

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttrValue {}

impl PartialOrd for AttrValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttrValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use AttrValue::*;
        // Integers and floats compare numerically with each other.
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.total_cmp(&b);
        }
        fn discriminant(v: &AttrValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
                List(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl AttrValue {
    /// Interpret the value as an `f64`. Only numeric variants convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Integer(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

// ---------------------------------------------------------------------------
// Coordinate – a named axis with its sampled values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: String,
    /// Dimensions this coordinate is indexed by.
    pub dims: Vec<String>,
    /// Sampled values along the axis, in storage order.
    pub values: Vec<AttrValue>,
    pub attrs: Attrs,
}

impl Coordinate {
    /// A dimension coordinate: one dimension, named after the coordinate.
    /// These are the dataset's indexes.
    pub fn is_index(&self) -> bool {
        self.dims.len() == 1 && self.dims[0] == self.name
    }

    pub fn first(&self) -> Option<&AttrValue> {
        self.values.first()
    }

    pub fn last(&self) -> Option<&AttrValue> {
        self.values.last()
    }
}

// ---------------------------------------------------------------------------
// Variable – one data variable (header only, no payload)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    /// Size along each of `dims`.
    pub shape: Vec<usize>,
    pub attrs: Attrs,
}

impl Variable {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

// ---------------------------------------------------------------------------
// Dataset – one opened file, or several combined
// ---------------------------------------------------------------------------

/// In-memory handle for an opened self-describing array file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Dimension name → size.
    pub dims: BTreeMap<String, usize>,
    /// Coordinates in file order. Order is significant for [`Dataset::indexes`].
    pub coords: Vec<Coordinate>,
    /// Data variables (coordinates excluded).
    pub data_vars: BTreeMap<String, Variable>,
    pub attrs: Attrs,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the dimension coordinates, in coordinate order.
    pub fn indexes(&self) -> Vec<&str> {
        self.coords
            .iter()
            .filter(|c| c.is_index())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn data_var_names(&self) -> BTreeSet<&str> {
        self.data_vars.keys().map(String::as_str).collect()
    }

    /// Indexes a data variable is laid out along: its dimensions that have a
    /// dimension coordinate. `None` when the variable does not exist.
    pub fn variable_indexes(&self, name: &str) -> Option<BTreeSet<String>> {
        let var = self.variable(name)?;
        let indexes = self.indexes();
        Some(
            var.dims
                .iter()
                .filter(|d| indexes.contains(&d.as_str()))
                .cloned()
                .collect(),
        )
    }

    // -- Builders, used by the sample generator and tests --

    /// Declare a dimension without a coordinate (e.g. `bnds`).
    pub fn with_dimension(mut self, name: impl Into<String>, size: usize) -> Self {
        self.dims.insert(name.into(), size);
        self
    }

    /// Add a dimension coordinate and its dimension.
    pub fn with_coordinate<V: Into<AttrValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let name = name.into();
        let values: Vec<AttrValue> = values.into_iter().map(Into::into).collect();
        self.dims.insert(name.clone(), values.len());
        self.coords.retain(|c| c.name != name);
        self.coords.push(Coordinate {
            dims: vec![name.clone()],
            name,
            values,
            attrs: Attrs::new(),
        });
        self
    }

    /// Add a data variable laid out along `dims`. Sizes come from the declared
    /// dimensions; an undeclared dimension has size 0.
    pub fn with_variable(mut self, name: impl Into<String>, dims: &[&str], attrs: Attrs) -> Self {
        let shape = dims
            .iter()
            .map(|d| self.dims.get(*d).copied().unwrap_or(0))
            .collect();
        self.data_vars.insert(
            name.into(),
            Variable {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                shape,
                attrs,
            },
        );
        self
    }
}

/// Build an attribute map from `(key, value)` pairs.
pub fn attrs<I, K, V>(pairs: I) -> Attrs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexes_keep_coordinate_order() {
        let ds = Dataset::new()
            .with_coordinate("time", [0.0, 1.0])
            .with_coordinate("lat", [-90.0, 90.0])
            .with_coordinate("lon", [0.0, 180.0]);
        assert_eq!(ds.indexes(), vec!["time", "lat", "lon"]);
    }

    #[test]
    fn test_auxiliary_coordinate_is_not_an_index() {
        let mut ds = Dataset::new().with_coordinate("lat", [0.0]);
        ds.coords.push(Coordinate {
            name: "height".to_string(),
            dims: vec![],
            values: vec![AttrValue::Float(2.0)],
            attrs: Attrs::new(),
        });
        assert_eq!(ds.indexes(), vec!["lat"]);
    }

    #[test]
    fn test_variable_shape_from_dims() {
        let ds = Dataset::new()
            .with_coordinate("time", [0.0, 1.0, 2.0])
            .with_coordinate("lat", [-45.0, 45.0])
            .with_dimension("bnds", 2)
            .with_variable("tas", &["time", "lat"], Attrs::new())
            .with_variable("time_bnds", &["time", "bnds"], Attrs::new());
        assert_eq!(ds.variable("tas").unwrap().shape, vec![3, 2]);
        assert_eq!(ds.variable("time_bnds").unwrap().rank(), 2);
    }

    #[test]
    fn test_variable_indexes_skip_dims_without_coordinate() {
        let ds = Dataset::new()
            .with_coordinate("time", [0.0])
            .with_dimension("bnds", 2)
            .with_variable("time_bnds", &["time", "bnds"], Attrs::new());
        let indexes = ds.variable_indexes("time_bnds").unwrap();
        assert_eq!(indexes, BTreeSet::from(["time".to_string()]));
        assert!(ds.variable_indexes("missing").is_none());
    }

    #[test]
    fn test_numeric_values_compare_across_variants() {
        assert!(AttrValue::Integer(1) < AttrValue::Float(1.5));
        assert!(AttrValue::Float(-0.5) < AttrValue::Integer(0));
        assert!(AttrValue::Null < AttrValue::String("a".into()));
    }

    #[test]
    fn test_numeric_values_equal_across_variants() {
        assert_eq!(AttrValue::Integer(-90), AttrValue::Float(-90.0));
        assert_ne!(AttrValue::Integer(1), AttrValue::String("1".into()));

        let ints = Dataset::new().with_coordinate("lat", [-90i64, 90]);
        let floats = Dataset::new().with_coordinate("lat", [-90.0, 90.0]);
        assert_eq!(ints.coordinate("lat"), floats.coordinate("lat"));
    }
}
