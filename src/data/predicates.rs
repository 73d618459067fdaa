use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use super::model::{AttrValue, Dataset};
use crate::errors::{Error, Result};

// ---------------------------------------------------------------------------
// Bound – one end of a requested coordinate range
// ---------------------------------------------------------------------------

/// A range bound as supplied by a caller. Only finite numbers can be compared
/// against coordinate values; anything else makes a range check inconclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Number(f64),
    Text(String),
}

impl Bound {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bound::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Bound::Number(v)
    }
}

impl From<i32> for Bound {
    fn from(v: i32) -> Self {
        Bound::Number(v as f64)
    }
}

impl From<&str> for Bound {
    fn from(v: &str) -> Self {
        Bound::Text(v.to_string())
    }
}

impl From<String> for Bound {
    fn from(v: String) -> Self {
        Bound::Text(v)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Number(v) => write!(f, "{v}"),
            Bound::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Bound::Number(v) => serializer.serialize_f64(*v),
            Bound::Text(s) => serializer.serialize_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------
//
// Each predicate inspects one structural aspect of an opened dataset. A failed
// open, or structure that is absent or of the wrong type, is a `false`
// verdict. Only an empty argument list is an error.

/// What a predicate looks at: an opened dataset, or the reason opening failed.
/// Borrow one from an [`Opened`](super::loader::Opened) with `as_ref()`.
pub type Handle<'a> = std::result::Result<&'a Dataset, &'a anyhow::Error>;

/// Whether the dataset's indexes start with `coords`, in that order.
pub fn has_coordinates(ds: Handle<'_>, coords: &[&str]) -> Result<bool> {
    if coords.is_empty() {
        return Err(Error::InvalidArgument(
            "has_coordinates needs at least one coordinate".to_string(),
        ));
    }
    let Ok(ds) = ds else {
        return Ok(false);
    };
    let indexes = ds.indexes();
    if indexes.len() < coords.len() {
        return Ok(false);
    }
    Ok(indexes.iter().zip(coords).all(|(i, c)| i == c))
}

/// Whether every name in `variables` is a data variable of the dataset.
pub fn has_variables(ds: Handle<'_>, variables: &BTreeSet<&str>) -> Result<bool> {
    if variables.is_empty() {
        return Err(Error::InvalidArgument(
            "has_variables needs at least one variable".to_string(),
        ));
    }
    let Ok(ds) = ds else {
        return Ok(false);
    };
    Ok(variables.is_subset(&ds.data_var_names()))
}

/// Whether `variable` has a `units` attribute equal to `value`.
pub fn has_attribute(ds: Handle<'_>, variable: &str, value: &str) -> bool {
    has_named_attribute(ds, variable, "units", value)
}

/// Whether `variable` has a string attribute `name` equal to `value`.
pub fn has_named_attribute(ds: Handle<'_>, variable: &str, name: &str, value: &str) -> bool {
    let Ok(ds) = ds else {
        return false;
    };
    ds.variable(variable)
        .and_then(|v| v.attrs.get(name))
        .and_then(AttrValue::as_str)
        .is_some_and(|found| found == value)
}

/// Whether `variable` is three-dimensional.
pub fn has_shape(ds: Handle<'_>, variable: &str) -> bool {
    let Ok(ds) = ds else {
        return false;
    };
    ds.variable(variable).is_some_and(|v| v.rank() == 3)
}

/// Whether the coordinate covers `lower..upper`.
///
/// The first sample must be at or below `lower`. The last sample is rounded up
/// to the next multiple of 10 before comparing with `upper`, so grids that stop
/// just short of a round boundary (89.5 for a 90 degree edge) still pass.
pub fn is_in_range(
    ds: Handle<'_>,
    coord_variable: &str,
    lower_bound: impl Into<Bound>,
    upper_bound: impl Into<Bound>,
) -> bool {
    let (Some(lower), Some(upper)) = (lower_bound.into().as_f64(), upper_bound.into().as_f64())
    else {
        return false;
    };
    let Ok(ds) = ds else {
        return false;
    };
    let Some(coord) = ds.coordinate(coord_variable) else {
        return false;
    };
    let (Some(first), Some(last)) = (
        coord.first().and_then(AttrValue::as_f64),
        coord.last().and_then(AttrValue::as_f64),
    ) else {
        return false;
    };
    first <= lower && round_up_to_ten(last) >= upper
}

fn round_up_to_ten(v: f64) -> f64 {
    (v / 10.0).ceil() * 10.0
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::data::loader::Opened;
    use crate::data::model::{attrs, Attrs};
    use crate::sample;

    fn opened() -> Opened {
        Ok(sample::global_dataset("tas", &[15.5, 45.0], attrs([("units", "K")])))
    }

    fn failed() -> Opened {
        Err(anyhow!("could not open"))
    }

    #[test]
    fn test_has_coordinates_prefix() {
        let ds = opened();
        assert_eq!(has_coordinates(ds.as_ref(), &["time", "lat", "lon"]), Ok(true));
        assert_eq!(has_coordinates(ds.as_ref(), &["time", "lat"]), Ok(true));
        assert_eq!(has_coordinates(ds.as_ref(), &["time"]), Ok(true));
    }

    #[test]
    fn test_has_coordinates_order_matters() {
        let ds = opened();
        assert_eq!(has_coordinates(ds.as_ref(), &["lat", "time", "lon"]), Ok(false));
        assert_eq!(has_coordinates(ds.as_ref(), &["lat"]), Ok(false));
    }

    #[test]
    fn test_has_coordinates_too_many() {
        let ds = opened();
        assert_eq!(
            has_coordinates(ds.as_ref(), &["time", "lat", "lon", "height"]),
            Ok(false)
        );
    }

    #[test]
    fn test_has_coordinates_empty_is_invalid() {
        assert!(matches!(
            has_coordinates(opened().as_ref(), &[]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            has_coordinates(failed().as_ref(), &[]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_has_coordinates_failed_open() {
        assert_eq!(has_coordinates(failed().as_ref(), &["time"]), Ok(false));
    }

    #[test]
    fn test_has_variables() {
        let ds = opened();
        assert_eq!(has_variables(ds.as_ref(), &BTreeSet::from(["tas"])), Ok(true));
        assert_eq!(
            has_variables(ds.as_ref(), &BTreeSet::from(["tas", "tasmax"])),
            Ok(false)
        );
        assert_eq!(
            has_variables(ds.as_ref(), &BTreeSet::from(["rubbish", "nodata"])),
            Ok(false)
        );
        assert_eq!(has_variables(failed().as_ref(), &BTreeSet::from(["tas"])), Ok(false));
    }

    #[test]
    fn test_has_variables_empty_is_invalid() {
        assert!(matches!(
            has_variables(opened().as_ref(), &BTreeSet::new()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_coordinates_are_not_variables() {
        assert_eq!(has_variables(opened().as_ref(), &BTreeSet::from(["lat"])), Ok(false));
    }

    #[test]
    fn test_has_attribute() {
        let ds = opened();
        assert!(has_attribute(ds.as_ref(), "tas", "K"));
        assert!(!has_attribute(ds.as_ref(), "tas", "degC"));
        assert!(!has_attribute(ds.as_ref(), "pr", "K"));
        assert!(!has_attribute(failed().as_ref(), "tas", "K"));
    }

    #[test]
    fn test_has_attribute_requires_text() {
        let ds = Ok(sample::global_dataset("tas", &[0.0], attrs([("units", 1i64)])));
        assert!(!has_attribute(ds.as_ref(), "tas", "1"));
    }

    #[test]
    fn test_has_named_attribute() {
        let ds = Ok(sample::global_dataset(
            "tas",
            &[0.0],
            attrs([("standard_name", "air_temperature")]),
        ));
        assert!(has_named_attribute(ds.as_ref(), "tas", "standard_name", "air_temperature"));
        assert!(!has_attribute(ds.as_ref(), "tas", "air_temperature"));
    }

    #[test]
    fn test_has_shape() {
        let ds = opened();
        assert!(has_shape(ds.as_ref(), "tas"));
        assert!(!has_shape(ds.as_ref(), "pr"));
        assert!(!has_shape(failed().as_ref(), "tas"));

        let flat = Ok(Dataset::new()
            .with_coordinate("time", [0.0])
            .with_variable("tas", &["time"], Attrs::new()));
        assert!(!has_shape(flat.as_ref(), "tas"));
    }

    #[test]
    fn test_is_in_range_latitude() {
        let ds = opened();
        assert!(is_in_range(ds.as_ref(), "lat", -90, 90));
        assert!(!is_in_range(ds.as_ref(), "lat", -90.5, 90.5));
        assert!(is_in_range(ds.as_ref(), "lat", -80, 80));
    }

    #[test]
    fn test_is_in_range_longitude() {
        let ds = opened();
        assert!(is_in_range(ds.as_ref(), "lon", 0, 360));
        assert!(!is_in_range(ds.as_ref(), "lon", -180, 180));
    }

    #[test]
    fn test_is_in_range_round_up_only_on_upper() {
        let ds = Ok(Dataset::new().with_coordinate("lat", [-89.5, 89.5]));
        assert!(!is_in_range(ds.as_ref(), "lat", -90, 90));
        assert!(is_in_range(ds.as_ref(), "lat", -89.5, 90));
    }

    #[test]
    fn test_is_in_range_inconclusive_inputs() {
        let ds = opened();
        assert!(!is_in_range(ds.as_ref(), "lat", "rubbish", 90));
        assert!(!is_in_range(ds.as_ref(), "lat", -90, f64::NAN));
        assert!(!is_in_range(ds.as_ref(), "height", -90, 90));
        assert!(!is_in_range(failed().as_ref(), "lat", -90, 90));

        let text_axis = Ok(Dataset::new().with_coordinate("lat", ["south", "north"]));
        assert!(!is_in_range(text_axis.as_ref(), "lat", -90, 90));

        let empty_axis = Ok(Dataset::new().with_coordinate("lat", Vec::<f64>::new()));
        assert!(!is_in_range(empty_axis.as_ref(), "lat", -90, 90));
    }

    #[test]
    fn test_bound_display() {
        assert_eq!(Bound::from(-90).to_string(), "-90");
        assert_eq!(Bound::from(90.5).to_string(), "90.5");
        assert_eq!(Bound::from("rubbish").to_string(), "\"rubbish\"");
    }
}
