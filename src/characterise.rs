use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::data::loader::{DatasetLoader, FileLoader};
use crate::data::model::Dataset;
use crate::data::predicates::{has_attribute, has_shape, has_variables, is_in_range, Bound};
use crate::report::{count_issues, CheckKey, CheckResult, Report, Results};

pub const DEFAULT_PROJECT: &str = "cmip5";
pub const DEFAULT_EXTENSION: &str = "nc";

/// Archive paths have exactly this many segments.
const PATH_SEGMENTS: usize = 13;
const ARCHIVE_ROOT: &str = "badc";

/// Dated version tag, e.g. `v20110113`. It may sit anywhere in the last
/// segment (`v20110113-fix`, `latest_v20110113`).
static RE_VERSION_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v20\d{6}").expect("version pattern is valid"));

// ---------------------------------------------------------------------------
// Expectations – what a full run checks against
// ---------------------------------------------------------------------------

/// Inputs for [`Characteriser::run_all`].
#[derive(Debug, Clone)]
pub struct Expectations {
    pub coords: Vec<String>,
    pub lat: (Bound, Bound),
    pub lon: (Bound, Bound),
    /// Units the variable must carry. Skipped when `None`.
    pub units: Option<String>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            coords: ["time", "lat", "lon"].map(String::from).to_vec(),
            lat: (Bound::from(-90), Bound::from(90)),
            lon: (Bound::from(0), Bound::from(360)),
            units: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Characteriser
// ---------------------------------------------------------------------------

/// The combined dataset of the last successful open, and the listing it came
/// from.
struct CachedDataset {
    files: Vec<PathBuf>,
    dataset: Dataset,
}

/// Runs archive checks against one directory and keeps their verdicts.
///
/// Every check is independent and may be called in any order. A check either
/// records exactly one verdict and returns the results, or returns `None`
/// without recording anything when its inputs could not be obtained (no
/// files, a dataset that will not open, unusable bounds).
pub struct Characteriser<L = FileLoader> {
    path: String,
    project: String,
    extension: String,
    loader: L,
    checks: Results,
    reuse_datasets: bool,
    cache: Option<CachedDataset>,
}

impl Characteriser<FileLoader> {
    /// Bind to `path` with the default project and the bundled loader.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_loader(path, FileLoader)
    }
}

impl<L: DatasetLoader> Characteriser<L> {
    pub fn with_loader(path: impl Into<String>, loader: L) -> Self {
        Self {
            path: path.into(),
            project: DEFAULT_PROJECT.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            loader,
            checks: Results::new(),
            reuse_datasets: true,
            cache: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Extension of the dataset files to look for, without the dot.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Reopen the dataset files on every check instead of keeping the last
    /// combined dataset.
    pub fn without_cache(mut self) -> Self {
        self.reuse_datasets = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn results(&self) -> &Results {
        &self.checks
    }

    // -- Checks --

    /// The directory follows `/badc/<project>/.../v20YYMMDD`, 13 segments deep.
    pub fn check_path(&mut self) -> &Results {
        let segments: Vec<&str> = self.path.trim_matches('/').split('/').collect();
        let good = segments.len() == PATH_SEGMENTS
            && segments[0] == ARCHIVE_ROOT
            && segments[1] == self.project
            && segments
                .last()
                .is_some_and(|last| RE_VERSION_DIR.is_match(last));

        let verdict = if good {
            CheckResult::Good
        } else {
            CheckResult::WrongPath
        };
        self.record(CheckKey::Path, verdict)
    }

    /// Every file in the directory starts with the same variable id.
    pub fn check_varnames(&mut self) -> &Results {
        let ids: BTreeSet<String> = self
            .list_files()
            .iter()
            .filter_map(|f| variable_id(f))
            .collect();

        if ids.len() == 1 {
            self.checks.remove(&CheckKey::InconsistentVariableNames);
            self.record(CheckKey::Varnames, CheckResult::Good)
        } else {
            self.checks.remove(&CheckKey::Varnames);
            self.record(
                CheckKey::InconsistentVariableNames,
                CheckResult::InconsistentNames(ids),
            )
        }
    }

    /// The first file holds the variable its name promises.
    pub fn check_var_in_file(&mut self) -> Option<&Results> {
        let files = self.list_files();
        let first = files.first()?;
        let var_id = variable_id(first)?;

        let ds = self.loader.open(first);
        if let Err(err) = &ds {
            warn!("{}: cannot open {}: {err:#}", self.path, first.display());
            return None;
        }

        let wanted = BTreeSet::from([var_id.as_str()]);
        let verdict = if matches!(has_variables(ds.as_ref(), &wanted), Ok(true)) {
            CheckResult::Good
        } else {
            CheckResult::NotPresent
        };
        Some(self.record(CheckKey::Var, verdict))
    }

    /// The variable is laid out along no index outside `coords`.
    ///
    /// The test is `variable indexes ⊆ coords`: a variable on fewer axes than
    /// requested passes, one with an extra axis fails. Order is not checked
    /// here; [`has_coordinates`](crate::data::predicates::has_coordinates)
    /// covers ordering.
    pub fn check_var_has_coords<S: AsRef<str>>(&mut self, coords: &[S]) -> Option<&Results> {
        let files = self.list_files();
        let var_id = variable_id(files.first()?)?;
        let path = self.path.clone();

        let verdict = {
            let ds = self.combined(files)?;
            let Some(actual) = ds.variable_indexes(&var_id) else {
                warn!("{path}: variable '{var_id}' not found in combined dataset");
                return None;
            };
            let expected: BTreeSet<&str> = coords.iter().map(|c| c.as_ref()).collect();
            if actual.iter().all(|c| expected.contains(c.as_str())) {
                CheckResult::Good
            } else {
                CheckResult::WrongDimensions(actual)
            }
        };
        Some(self.record(CheckKey::Coords, verdict))
    }

    /// The `lat` axis covers `lower..upper`.
    pub fn check_lat_in_range(
        &mut self,
        lower: impl Into<Bound>,
        upper: impl Into<Bound>,
    ) -> Option<&Results> {
        self.check_range(CheckKey::Latitude, "lat", lower.into(), upper.into())
    }

    /// The `lon` axis covers `lower..upper`.
    pub fn check_lon_in_range(
        &mut self,
        lower: impl Into<Bound>,
        upper: impl Into<Bound>,
    ) -> Option<&Results> {
        self.check_range(CheckKey::Longitude, "lon", lower.into(), upper.into())
    }

    /// The variable's `units` attribute is `units`.
    pub fn check_var_units(&mut self, units: &str) -> Option<&Results> {
        let files = self.list_files();
        let var_id = variable_id(files.first()?)?;
        let path = self.path.clone();

        let verdict = {
            let ds = self.combined(files)?;
            if ds.variable(&var_id).is_none() {
                warn!("{path}: variable '{var_id}' not found in combined dataset");
                return None;
            }
            if has_attribute(Ok(ds), &var_id, units) {
                CheckResult::Good
            } else {
                CheckResult::IncorrectUnits(units.to_string())
            }
        };
        Some(self.record(CheckKey::Units, verdict))
    }

    /// The variable is three-dimensional.
    pub fn check_var_shape(&mut self) -> Option<&Results> {
        let files = self.list_files();
        let var_id = variable_id(files.first()?)?;
        let path = self.path.clone();

        let verdict = {
            let ds = self.combined(files)?;
            let Some(rank) = ds.variable(&var_id).map(|v| v.rank()) else {
                warn!("{path}: variable '{var_id}' not found in combined dataset");
                return None;
            };
            if has_shape(Ok(ds), &var_id) {
                CheckResult::Good
            } else {
                CheckResult::WrongRank(rank)
            }
        };
        Some(self.record(CheckKey::Shape, verdict))
    }

    /// Run every check against `expected` and summarise.
    pub fn run_all(&mut self, expected: &Expectations) -> (usize, &Results) {
        self.check_path();
        self.check_varnames();
        self.check_var_in_file();
        self.check_var_has_coords(expected.coords.as_slice());
        self.check_lat_in_range(expected.lat.0.clone(), expected.lat.1.clone());
        self.check_lon_in_range(expected.lon.0.clone(), expected.lon.1.clone());
        if let Some(units) = &expected.units {
            self.check_var_units(units);
        }
        self.check_var_shape();
        self.summarize()
    }

    /// Count of recorded verdicts that are not `GOOD`, and all verdicts.
    pub fn summarize(&self) -> (usize, &Results) {
        (count_issues(&self.checks), &self.checks)
    }

    pub fn report(&self) -> Report {
        let (issues, checks) = self.summarize();
        Report {
            path: self.path.clone(),
            project: self.project.clone(),
            issues,
            checks: checks.clone(),
        }
    }

    // -- Internals --

    fn record(&mut self, key: CheckKey, verdict: CheckResult) -> &Results {
        info!("{}: {key} = {verdict}", self.path);
        self.checks.insert(key, verdict);
        &self.checks
    }

    fn check_range(
        &mut self,
        key: CheckKey,
        coord: &str,
        lower: Bound,
        upper: Bound,
    ) -> Option<&Results> {
        if lower.as_f64().is_none() || upper.as_f64().is_none() {
            warn!("{}: {key} skipped, bounds ({lower}, {upper}) are not numeric", self.path);
            return None;
        }
        let files = self.list_files();
        if files.is_empty() {
            debug!("{}: {key} skipped, no files", self.path);
            return None;
        }

        let verdict = {
            let ds = self.combined(files)?;
            if is_in_range(Ok(ds), coord, lower.clone(), upper.clone()) {
                CheckResult::Good
            } else {
                CheckResult::IncorrectRange(lower, upper)
            }
        };
        Some(self.record(key, verdict))
    }

    /// Dataset files directly inside the directory, sorted by name. An
    /// unreadable directory lists as empty.
    fn list_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("{}: cannot list directory: {err}", self.path);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == self.extension)
            })
            .collect();
        files.sort();
        debug!("{}: {} dataset file(s)", self.path, files.len());
        files
    }

    /// Open `files` as one dataset, reusing the last one when the listing is
    /// unchanged.
    fn combined(&mut self, files: Vec<PathBuf>) -> Option<&Dataset> {
        if files.is_empty() {
            return None;
        }
        let fresh = self.reuse_datasets
            && self
                .cache
                .as_ref()
                .is_some_and(|cached| cached.files == files);

        if fresh {
            debug!("{}: reusing combined dataset", self.path);
        } else {
            match self.loader.open_many(&files) {
                Ok(dataset) => self.cache = Some(CachedDataset { files, dataset }),
                Err(err) => {
                    warn!("{}: cannot open dataset files: {err:#}", self.path);
                    self.cache = None;
                    return None;
                }
            }
        }
        self.cache.as_ref().map(|cached| &cached.dataset)
    }
}

/// The variable id a file name promises: the token before the first `_`,
/// ignoring leading and trailing underscores.
pub fn variable_id(file: &Path) -> Option<String> {
    let name = file.file_name()?.to_str()?;
    name.trim_matches('_')
        .split('_')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
