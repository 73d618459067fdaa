use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::ser::{SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::data::predicates::Bound;

/// The literal success marker.
pub const GOOD: &str = "GOOD";

// ---------------------------------------------------------------------------
// CheckKey – where a verdict is recorded
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CheckKey {
    #[serde(rename = "path_check")]
    Path,
    #[serde(rename = "varnames_check")]
    Varnames,
    /// Diagnostic key used instead of `varnames_check` when files disagree.
    #[serde(rename = "INCONSISTENT VARIABLE NAMES")]
    InconsistentVariableNames,
    #[serde(rename = "var_check")]
    Var,
    #[serde(rename = "coords_check")]
    Coords,
    #[serde(rename = "latitude_check")]
    Latitude,
    #[serde(rename = "longitude_check")]
    Longitude,
    #[serde(rename = "units_check")]
    Units,
    #[serde(rename = "shape_check")]
    Shape,
}

impl CheckKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKey::Path => "path_check",
            CheckKey::Varnames => "varnames_check",
            CheckKey::InconsistentVariableNames => "INCONSISTENT VARIABLE NAMES",
            CheckKey::Var => "var_check",
            CheckKey::Coords => "coords_check",
            CheckKey::Latitude => "latitude_check",
            CheckKey::Longitude => "longitude_check",
            CheckKey::Units => "units_check",
            CheckKey::Shape => "shape_check",
        }
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CheckResult – one recorded verdict
// ---------------------------------------------------------------------------

/// A recorded verdict. A check that could not run records nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Good,
    WrongPath,
    NotPresent,
    /// Every distinct variable id found in the directory.
    InconsistentNames(BTreeSet<String>),
    /// The variable's actual index set.
    WrongDimensions(BTreeSet<String>),
    /// The bounds that were tried.
    IncorrectRange(Bound, Bound),
    /// The units that were expected.
    IncorrectUnits(String),
    /// The variable's actual rank.
    WrongRank(usize),
}

impl CheckResult {
    pub fn is_good(&self) -> bool {
        matches!(self, CheckResult::Good)
    }

    /// The status marker, without payload.
    pub fn marker(&self) -> &'static str {
        match self {
            CheckResult::Good => GOOD,
            CheckResult::WrongPath => "WRONG PATH",
            CheckResult::NotPresent => "NOT PRESENT",
            CheckResult::InconsistentNames(_) => "INCONSISTENT VARIABLE NAMES",
            CheckResult::WrongDimensions(_) => "WRONG DIMENSIONS",
            CheckResult::IncorrectRange(..) => "INCORRECT RANGE",
            CheckResult::IncorrectUnits(_) => "INCORRECT UNITS",
            CheckResult::WrongRank(_) => "WRONG SHAPE",
        }
    }
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Good | CheckResult::WrongPath | CheckResult::NotPresent => {
                f.write_str(self.marker())
            }
            CheckResult::InconsistentNames(names) => write!(f, "{{{}}}", join_names(names)),
            CheckResult::WrongDimensions(names) => {
                write!(f, "{} {{{}}}", self.marker(), join_names(names))
            }
            CheckResult::IncorrectRange(lower, upper) => {
                write!(f, "{} ({lower}, {upper})", self.marker())
            }
            CheckResult::IncorrectUnits(units) => write!(f, "{} ({units:?})", self.marker()),
            CheckResult::WrongRank(rank) => write!(f, "{} (rank {rank})", self.marker()),
        }
    }
}

/// Plain markers serialize as strings, markers with payload as
/// `[marker, payload]`. The inconsistent-names entry is the bare set.
impl Serialize for CheckResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CheckResult::Good | CheckResult::WrongPath | CheckResult::NotPresent => {
                serializer.serialize_str(self.marker())
            }
            CheckResult::InconsistentNames(names) => {
                let mut seq = serializer.serialize_seq(Some(names.len()))?;
                for name in names {
                    seq.serialize_element(name)?;
                }
                seq.end()
            }
            CheckResult::WrongDimensions(names) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(self.marker())?;
                tup.serialize_element(names)?;
                tup.end()
            }
            CheckResult::IncorrectRange(lower, upper) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(self.marker())?;
                tup.serialize_element(&(lower, upper))?;
                tup.end()
            }
            CheckResult::IncorrectUnits(units) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(self.marker())?;
                tup.serialize_element(units)?;
                tup.end()
            }
            CheckResult::WrongRank(rank) => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(self.marker())?;
                tup.serialize_element(rank)?;
                tup.end()
            }
        }
    }
}

/// Verdicts by check. One entry per key; re-running a check overwrites it.
pub type Results = BTreeMap<CheckKey, CheckResult>;

/// Number of entries that are not [`CheckResult::Good`].
pub fn count_issues(results: &Results) -> usize {
    results.values().filter(|r| !r.is_good()).count()
}

// ---------------------------------------------------------------------------
// Report – the externally consumed artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub path: String,
    pub project: String,
    pub issues: usize,
    pub checks: Results,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.path, self.project)?;
        for (key, result) in &self.checks {
            writeln!(f, "  {key:<28} {result}")?;
        }
        write!(f, "{} issue(s)", self.issues)
    }
}
