//! Renders the `skiff(1)` manual page from the clap definitions.
//!
//! The page lands at `$OUT_DIR/man/skiff.1`; packagers copy it to
//! `share/man/man1`. Only the CLI module affects the output.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

const MAN_PAGE: &str = "skiff.1";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    writeln!(io::stdout(), "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?;
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let command = cli::Cli::command();
    let mut page = Vec::new();
    Man::new(command).section("1").render(&mut page)?;
    fs::write(man_dir.join(MAN_PAGE), page)?;

    Ok(())
}
