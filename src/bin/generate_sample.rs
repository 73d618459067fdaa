use std::path::PathBuf;

use anyhow::Result;

use cmip_characterise::sample::write_sample_tree;

/// Write a small CMIP5-style run to the directory given on the command line
/// (default `sample_data`), ready to point `cmip-characterise` at.
fn main() -> Result<()> {
    env_logger::init();

    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));

    let var_dir = write_sample_tree(&root)?;
    let files = std::fs::read_dir(&var_dir)?.count();

    println!("Wrote {files} dataset file(s) to {}", var_dir.display());
    println!("Try: cargo run -- {} --units %", var_dir.display());
    println!("path_check reports WRONG PATH here: the run is not at /badc and sic/ sits below the version directory");
    Ok(())
}
