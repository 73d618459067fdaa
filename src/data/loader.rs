use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;
use serde_json::{Map, Value as JsonValue};

use super::combine::combine_by_coords;
use super::model::{AttrValue, Attrs, Coordinate, Dataset, Variable};

/// An opened dataset, or the reason it could not be opened.
pub type Opened = Result<Dataset>;

const NETCDF_MAGIC: &[u8] = b"CDF";
const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";

// ---------------------------------------------------------------------------
// Loader seam
// ---------------------------------------------------------------------------

/// Opens dataset files. Implement this to plug in a native array-file reader.
pub trait DatasetLoader {
    /// Open a single file.
    fn open(&self, path: &Path) -> Opened;

    /// Open several files as one dataset, combined along their coordinates.
    fn open_many(&self, paths: &[PathBuf]) -> Opened {
        let parts = paths
            .iter()
            .map(|p| self.open(p))
            .collect::<Result<Vec<_>>>()?;
        combine_by_coords(parts)
    }
}

/// The bundled loader: reads the xarray dictionary layout from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl DatasetLoader for FileLoader {
    fn open(&self, path: &Path) -> Opened {
        load_file(path)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.json` – xarray dictionary layout (`ds.to_dict()` dumped as JSON)
/// * `.nc` / `.nc4` / `.cdf` – the same layout stored under a netCDF name.
///   Real binary netCDF or HDF5 content is detected by its magic bytes and
///   rejected; decoding it is left to another [`DatasetLoader`].
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" | "nc" | "nc4" | "cdf" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema, key order preserved:
///
/// ```json
/// {
///   "dims": { "time": 2, "lat": 3, "lon": 4 },
///   "coords": {
///     "time": { "dims": ["time"], "attrs": {}, "data": [15.5, 45.0] },
///     "lat":  { "dims": ["lat"],  "attrs": { "units": "degrees_north" }, "data": [-89.5, 0.0, 89.5] }
///   },
///   "data_vars": {
///     "tas": { "dims": ["time", "lat", "lon"], "attrs": { "units": "K" } }
///   },
///   "attrs": { "project_id": "CMIP5" }
/// }
/// ```
///
/// A data variable may carry an explicit `shape`; otherwise it is derived
/// from `dims`.
fn load_json(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.starts_with(NETCDF_MAGIC) || bytes.starts_with(HDF5_MAGIC) {
        bail!(
            "{}: binary netCDF/HDF5 content needs a native DatasetLoader",
            path.display()
        );
    }
    let root: JsonValue = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing JSON in {}", path.display()))?;
    let ds = parse_dataset(&root).with_context(|| format!("reading layout of {}", path.display()))?;
    debug!(
        "opened {} ({} coords, {} data vars)",
        path.display(),
        ds.coords.len(),
        ds.data_vars.len()
    );
    Ok(ds)
}

/// Build a [`Dataset`] from the dictionary layout.
pub fn parse_dataset(root: &JsonValue) -> Result<Dataset> {
    let obj = root
        .as_object()
        .context("Expected top-level JSON object")?;

    let mut dims = BTreeMap::new();
    if let Some(raw) = obj.get("dims") {
        let raw = raw.as_object().context("'dims' is not an object")?;
        for (name, size) in raw {
            let size = size
                .as_u64()
                .with_context(|| format!("dimension '{name}': size is not a non-negative integer"))?;
            dims.insert(name.clone(), size as usize);
        }
    }

    let mut coords = Vec::new();
    for (name, entry) in optional_object(obj, "coords")? {
        let entry = entry
            .as_object()
            .with_context(|| format!("coordinate '{name}' is not an object"))?;
        let coord_dims = dim_names(entry.get("dims"))
            .with_context(|| format!("coordinate '{name}': invalid 'dims'"))?;
        let values = match entry.get("data") {
            Some(JsonValue::Array(items)) => items.iter().map(json_to_attr).collect(),
            Some(JsonValue::Null) | None => Vec::new(),
            // 0-d coordinate stored as a bare scalar
            Some(scalar) => vec![json_to_attr(scalar)],
        };
        let attrs = parse_attrs(entry.get("attrs"))
            .with_context(|| format!("coordinate '{name}': invalid 'attrs'"))?;
        let coord = Coordinate {
            name: name.clone(),
            dims: coord_dims,
            values,
            attrs,
        };
        if coord.is_index() && !coord.values.is_empty() {
            dims.entry(name.clone()).or_insert(coord.values.len());
        }
        coords.push(coord);
    }

    let mut data_vars = BTreeMap::new();
    for (name, entry) in optional_object(obj, "data_vars")? {
        let entry = entry
            .as_object()
            .with_context(|| format!("variable '{name}' is not an object"))?;
        let var_dims = dim_names(entry.get("dims"))
            .with_context(|| format!("variable '{name}': invalid 'dims'"))?;
        let shape = match entry.get("shape") {
            Some(raw) => {
                let raw = raw
                    .as_array()
                    .with_context(|| format!("variable '{name}': 'shape' is not an array"))?;
                raw.iter()
                    .enumerate()
                    .map(|(j, v)| {
                        v.as_u64().map(|s| s as usize).with_context(|| {
                            format!("variable '{name}', shape[{j}]: not a non-negative integer")
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => var_dims
                .iter()
                .map(|d| {
                    dims.get(d)
                        .copied()
                        .with_context(|| format!("variable '{name}': unknown dimension '{d}'"))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        if shape.len() != var_dims.len() {
            bail!(
                "variable '{name}': {} dims but shape has {} entries",
                var_dims.len(),
                shape.len()
            );
        }
        let attrs = parse_attrs(entry.get("attrs"))
            .with_context(|| format!("variable '{name}': invalid 'attrs'"))?;
        data_vars.insert(
            name.clone(),
            Variable {
                dims: var_dims,
                shape,
                attrs,
            },
        );
    }

    let attrs = parse_attrs(obj.get("attrs")).context("invalid global 'attrs'")?;

    Ok(Dataset {
        dims,
        coords,
        data_vars,
        attrs,
    })
}

fn optional_object<'a>(
    obj: &'a Map<String, JsonValue>,
    key: &str,
) -> Result<Vec<(&'a String, &'a JsonValue)>> {
    match obj.get(key) {
        Some(JsonValue::Object(map)) => Ok(map.iter().collect()),
        Some(JsonValue::Null) | None => Ok(Vec::new()),
        Some(_) => bail!("'{key}' is not an object"),
    }
}

/// `dims` is a list of names; a single name is accepted for 1-d entries.
fn dim_names(val: Option<&JsonValue>) -> Result<Vec<String>> {
    match val {
        Some(JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(j, v)| {
                v.as_str()
                    .map(str::to_string)
                    .with_context(|| format!("dims[{j}]: not a string"))
            })
            .collect(),
        Some(JsonValue::String(s)) => Ok(vec![s.clone()]),
        Some(JsonValue::Null) | None => Ok(Vec::new()),
        Some(other) => bail!("expected a list of names, got {other}"),
    }
}

fn parse_attrs(val: Option<&JsonValue>) -> Result<Attrs> {
    match val {
        Some(JsonValue::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_attr(v)))
            .collect()),
        Some(JsonValue::Null) | None => Ok(Attrs::new()),
        Some(_) => bail!("expected an object"),
    }
}

fn json_to_attr(val: &JsonValue) -> AttrValue {
    match val {
        JsonValue::String(s) => AttrValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttrValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                AttrValue::Float(f)
            } else {
                AttrValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => AttrValue::Bool(*b),
        JsonValue::Null => AttrValue::Null,
        JsonValue::Array(items) => AttrValue::List(items.iter().map(json_to_attr).collect()),
        other => AttrValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON writer
// ---------------------------------------------------------------------------

/// Render a dataset in the layout [`parse_dataset`] reads.
pub fn to_json(ds: &Dataset) -> JsonValue {
    let dims: Map<String, JsonValue> = ds
        .dims
        .iter()
        .map(|(name, size)| (name.clone(), JsonValue::from(*size)))
        .collect();

    let coords: Map<String, JsonValue> = ds
        .coords
        .iter()
        .map(|c| {
            let mut entry = Map::new();
            entry.insert("dims".into(), JsonValue::from(c.dims.clone()));
            entry.insert("attrs".into(), attrs_to_json(&c.attrs));
            entry.insert(
                "data".into(),
                JsonValue::Array(c.values.iter().map(attr_to_json).collect()),
            );
            (c.name.clone(), JsonValue::Object(entry))
        })
        .collect();

    let data_vars: Map<String, JsonValue> = ds
        .data_vars
        .iter()
        .map(|(name, v)| {
            let mut entry = Map::new();
            entry.insert("dims".into(), JsonValue::from(v.dims.clone()));
            entry.insert("attrs".into(), attrs_to_json(&v.attrs));
            entry.insert("shape".into(), JsonValue::from(v.shape.clone()));
            (name.clone(), JsonValue::Object(entry))
        })
        .collect();

    let mut root = Map::new();
    root.insert("dims".into(), JsonValue::Object(dims));
    root.insert("coords".into(), JsonValue::Object(coords));
    root.insert("data_vars".into(), JsonValue::Object(data_vars));
    root.insert("attrs".into(), attrs_to_json(&ds.attrs));
    JsonValue::Object(root)
}

/// Write a dataset to `path` in the dictionary layout.
pub fn write_json(path: &Path, ds: &Dataset) -> Result<()> {
    let text = serde_json::to_string_pretty(&to_json(ds)).context("serializing dataset")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn attrs_to_json(attrs: &Attrs) -> JsonValue {
    JsonValue::Object(
        attrs
            .iter()
            .map(|(k, v)| (k.clone(), attr_to_json(v)))
            .collect(),
    )
}

fn attr_to_json(val: &AttrValue) -> JsonValue {
    match val {
        AttrValue::String(s) => JsonValue::from(s.clone()),
        AttrValue::Integer(i) => JsonValue::from(*i),
        AttrValue::Float(f) => JsonValue::from(*f),
        AttrValue::Bool(b) => JsonValue::from(*b),
        AttrValue::List(items) => JsonValue::Array(items.iter().map(attr_to_json).collect()),
        AttrValue::Null => JsonValue::Null,
    }
}
