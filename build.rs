//! Build script for generating the `lambda-toolio` man pages.
//!
//! Renders `lambda-toolio.1` with an ENVIRONMENT section, plus one
//! `lambda-toolio-<command>.1` page per subcommand, into `OUT_DIR`.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

const BIN_NAME: &str = "lambda-toolio";

const ENVIRONMENT: &str = r#".SH ENVIRONMENT
.TP
\fBLAMBDA_API_KEY\fR
Lambda Cloud API key. Required by every command except \fBrun-script\fR.
May also be set in a \fI.env\fR file in the working directory.
.TP
\fBLAMBDA_BASE_URL\fR
API base URL. Defaults to https://cloud.lambdalabs.com/api/v1.
.TP
\fBLAMBDA_TOOLIO_CONFIG_PATH\fR
Explicit path to a \fIlambda-toolio.toml\fR configuration file.
Other \fBLAMBDA_\fR and \fBLAMBDA_SSH_\fR variables override the matching
keys of that file.
.TP
\fBRUST_LOG\fR
Log filter for diagnostics written to stderr. Defaults to \fBinfo\fR.
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let root = Cli::command();
    write_page(&out_dir, BIN_NAME, root.clone(), Some(ENVIRONMENT))?;

    for subcommand in root.get_subcommands() {
        let page_name = format!("{BIN_NAME}-{}", subcommand.get_name());
        let page = subcommand
            .clone()
            .bin_name(format!("{BIN_NAME} {}", subcommand.get_name()));
        write_page(&out_dir, &page_name, page, None)?;
    }

    Ok(())
}

fn write_page(
    out_dir: &Path,
    page_name: &str,
    command: Command,
    environment: Option<&str>,
) -> io::Result<()> {
    let has_subcommands = command.has_subcommands();
    let man = Man::new(command).title(page_name.to_uppercase());
    let mut buffer = Vec::new();
    man.render_title(&mut buffer)?;
    man.render_name_section(&mut buffer)?;
    man.render_synopsis_section(&mut buffer)?;
    man.render_description_section(&mut buffer)?;
    man.render_options_section(&mut buffer)?;
    if has_subcommands {
        man.render_subcommands_section(&mut buffer)?;
    }
    if let Some(section) = environment {
        buffer.extend_from_slice(section.as_bytes());
        man.render_version_section(&mut buffer)?;
    }

    fs::write(out_dir.join(format!("{page_name}.1")), buffer)
}
