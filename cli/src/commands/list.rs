//! `gbampy list` command.

use std::path::Path;

use clap::Args;
use comfy_table::Table;
use gbampy_core::ProjectConfig;
use gbampy_runtime::FileItem;

use crate::output::new_table;

#[derive(Args)]
pub struct ListArgs;

pub fn execute(_args: ListArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProjectConfig::load(config_path)?;
    let items = gbampy_runtime::list_files(&config)?;
    println!("{}", file_table(&items));
    Ok(())
}

fn file_table(items: &[FileItem]) -> Table {
    let mut table = new_table(&["TARGET", "KIND", "COMPILE"]);
    for item in items {
        let kind = if item.is_directory { "dir" } else { "file" };
        let compile = if item.needs_compile { "yes" } else { "no" };
        table.add_row(vec![item.target_path.to_string(), kind.to_string(), compile.to_string()]);
    }
    table
}
