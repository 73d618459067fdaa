//! Synthetic CMIP5-style datasets for demos and tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::loader::write_json;
use crate::data::model::{attrs, Attrs, Dataset};

/// Latitude axis: starts on the pole, stops short of the other one.
pub const LATITUDES: [f64; 5] = [-90.0, -45.0, 0.0, 45.0, 89.5];

/// Longitude axis on the 0..360 convention.
pub const LONGITUDES: [f64; 4] = [0.0, 90.0, 180.0, 358.75];

/// Archive directory of the sample run, relative to the output root.
pub const RUN_DIR: &str =
    "badc/cmip5/data/cmip5/output1/MOHC/HadGEM2-ES/rcp45/day/seaIce/day/r1i1p1/v20110113";

/// A `(time, lat, lon)` dataset holding one variable.
pub fn global_dataset(variable: &str, time: &[f64], var_attrs: Attrs) -> Dataset {
    Dataset::new()
        .with_coordinate("time", time.iter().copied())
        .with_coordinate("lat", LATITUDES)
        .with_coordinate("lon", LONGITUDES)
        .with_variable(variable, &["time", "lat", "lon"], var_attrs)
}

/// Write the sample run under `root` and return the variable directory.
///
/// The `sic` directory holds two files that split the time axis between them.
pub fn write_sample_tree(root: &Path) -> Result<PathBuf> {
    let var_dir = root.join(RUN_DIR).join("sic");
    std::fs::create_dir_all(&var_dir)
        .with_context(|| format!("creating {}", var_dir.display()))?;

    let units = attrs([("units", "%"), ("standard_name", "sea_ice_area_fraction")]);
    let chunks: [(&str, Vec<f64>); 2] = [
        (
            "sic_day_HadGEM2-ES_rcp45_r1i1p1_20051201-20151130.nc",
            (0..4).map(|d| d as f64 * 900.0).collect(),
        ),
        (
            "sic_day_HadGEM2-ES_rcp45_r1i1p1_20151201-20251130.nc",
            (4..8).map(|d| d as f64 * 900.0).collect(),
        ),
    ];

    for (name, time) in &chunks {
        let mut ds = global_dataset("sic", time, units.clone());
        ds.attrs = attrs([
            ("project_id", "CMIP5"),
            ("model_id", "HadGEM2-ES"),
            ("experiment_id", "rcp45"),
        ]);
        write_json(&var_dir.join(name), &ds)?;
    }

    Ok(var_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_has_thirteen_segments() {
        assert_eq!(RUN_DIR.split('/').count(), 13);
    }

    #[test]
    fn test_write_sample_tree() {
        let root = tempfile::tempdir().unwrap();
        let var_dir = write_sample_tree(root.path()).unwrap();
        let count = std::fs::read_dir(&var_dir).unwrap().count();
        assert_eq!(count, 2);
    }
}
