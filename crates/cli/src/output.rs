//! Output format shared across subcommands: human-readable text by
//! default, or `--output json` for scripting.

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
