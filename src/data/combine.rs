use anyhow::{bail, Context, Result};
use log::debug;

use super::model::{AttrValue, Dataset};

// ---------------------------------------------------------------------------
// Coordinate-based combination
// ---------------------------------------------------------------------------

/// Combine per-file datasets into one, using their index coordinates to
/// decide how they fit together.
///
/// * All parts must share the same indexes, in the same order.
/// * The index whose values differ between parts is the concatenation
///   dimension. Parts are ordered along it and the joined axis must be
///   strictly monotonic.
/// * When no index differs the parts are merged variable by variable.
/// * Parts differing along more than one index are rejected.
pub fn combine_by_coords(parts: Vec<Dataset>) -> Result<Dataset> {
    if parts.len() <= 1 {
        return parts
            .into_iter()
            .next()
            .context("no datasets to combine");
    }

    let index_names: Vec<String> = parts[0].indexes().into_iter().map(String::from).collect();
    for (i, part) in parts.iter().enumerate().skip(1) {
        if part
            .indexes()
            .into_iter()
            .ne(index_names.iter().map(String::as_str))
        {
            bail!(
                "part {i} has indexes [{}], expected [{}]",
                part.indexes().join(", "),
                index_names.join(", ")
            );
        }
    }

    let varying: Vec<String> = index_names
        .iter()
        .filter(|name| {
            let reference = coordinate_values(&parts[0], name);
            parts
                .iter()
                .skip(1)
                .any(|p| coordinate_values(p, name) != reference)
        })
        .cloned()
        .collect();

    match varying.as_slice() {
        [] => merge(parts),
        [dim] => {
            let dim = dim.clone();
            concat(parts, &dim)
        }
        many => bail!(
            "cannot combine along more than one dimension: {}",
            many.join(", ")
        ),
    }
}

fn coordinate_values<'a>(ds: &'a Dataset, name: &str) -> &'a [AttrValue] {
    ds.coordinate(name)
        .map(|c| c.values.as_slice())
        .unwrap_or(&[])
}

fn is_strictly_monotonic(values: &[AttrValue]) -> bool {
    values.windows(2).all(|w| w[0] < w[1]) || values.windows(2).all(|w| w[0] > w[1])
}

/// Join parts end to end along `dim`.
fn concat(mut parts: Vec<Dataset>, dim: &str) -> Result<Dataset> {
    for (i, part) in parts.iter().enumerate() {
        if coordinate_values(part, dim).is_empty() {
            bail!("part {i} has no values along '{dim}'");
        }
    }

    parts.sort_by(|a, b| coordinate_values(a, dim)[0].cmp(&coordinate_values(b, dim)[0]));
    let mut joined: Vec<AttrValue> = parts
        .iter()
        .flat_map(|p| coordinate_values(p, dim).iter().cloned())
        .collect();
    if !is_strictly_monotonic(&joined) {
        // descending axes are joined in reverse part order
        parts.reverse();
        joined = parts
            .iter()
            .flat_map(|p| coordinate_values(p, dim).iter().cloned())
            .collect();
        if !is_strictly_monotonic(&joined) {
            bail!("values along '{dim}' are not monotonic once combined");
        }
    }

    let mut rest = parts.into_iter();
    let mut combined = rest.next().context("no datasets to combine")?;

    for (offset, part) in rest.enumerate() {
        let i = offset + 1;
        for (name, var) in combined.data_vars.iter_mut() {
            let Some(axis) = var.dims.iter().position(|d| d == dim) else {
                continue;
            };
            let other = part
                .data_vars
                .get(name)
                .with_context(|| format!("variable '{name}' missing from part {i}"))?;
            if other.dims != var.dims {
                bail!(
                    "variable '{name}' has dims [{}] in part {i}, expected [{}]",
                    other.dims.join(", "),
                    var.dims.join(", ")
                );
            }
            for (j, (a, b)) in var.shape.iter().zip(&other.shape).enumerate() {
                if j != axis && a != b {
                    bail!(
                        "variable '{name}' has size {b} along '{}' in part {i}, expected {a}",
                        var.dims[j]
                    );
                }
            }
            var.shape[axis] = var.shape[axis]
                .checked_add(other.shape[axis])
                .with_context(|| format!("variable '{name}': size along '{dim}' overflows"))?;
        }

        for (name, var) in &part.data_vars {
            if combined.data_vars.contains_key(name) {
                continue;
            }
            if var.dims.iter().any(|d| d == dim) {
                bail!("variable '{name}' missing from the first part along '{dim}'");
            }
            combined.data_vars.insert(name.clone(), var.clone());
        }

        for coord in combined.coords.iter_mut() {
            if coord.dims.len() == 1 && coord.dims[0] == dim {
                if let Some(other) = part.coordinate(&coord.name) {
                    coord.values.extend(other.values.iter().cloned());
                }
            }
        }
    }

    combined.dims.insert(dim.to_string(), joined.len());
    debug!("combined along '{dim}' into {} steps", joined.len());
    Ok(combined)
}

/// Union parts that share identical indexes.
fn merge(parts: Vec<Dataset>) -> Result<Dataset> {
    let mut rest = parts.into_iter();
    let mut combined = rest.next().context("no datasets to combine")?;

    for part in rest {
        for (name, size) in part.dims {
            match combined.dims.get(&name) {
                Some(existing) if *existing != size => {
                    bail!("dimension '{name}' has size {size}, expected {existing}")
                }
                Some(_) => {}
                None => {
                    combined.dims.insert(name, size);
                }
            }
        }
        for (name, var) in part.data_vars {
            match combined.data_vars.get(&name) {
                Some(existing) if existing.dims != var.dims || existing.shape != var.shape => {
                    bail!("variable '{name}' conflicts between parts")
                }
                Some(_) => {}
                None => {
                    combined.data_vars.insert(name, var);
                }
            }
        }
        for coord in part.coords {
            if combined.coordinate(&coord.name).is_none() {
                combined.coords.push(coord);
            }
        }
    }

    Ok(combined)
}
