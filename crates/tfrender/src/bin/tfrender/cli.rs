//! tfrender cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfrender ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the demo project (an IAM group with users)
    ///
    /// Writes one `<file>.json` per file into the output directory
    Render(RenderCommand),
}

#[derive(Parser, Debug)]
pub struct RenderCommand {
    /// Directory to write the rendered files to
    #[clap(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Set a variable, e.g. `--var 'user_names=["peanut"]'`
    ///
    /// The value is parsed as json, anything that is not valid json is taken as a string.
    /// Values in variable definitions files must not contradict it.
    #[clap(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<VarArg>,

    /// Print the rendered files instead of writing them
    #[clap(short = 'p', long = "print")]
    pub print: bool,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarArg {
    pub name: String,
    pub value: serde_json::Value,
}

impl FromStr for VarArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, value)) = s.split_once('=') else {
            anyhow::bail!("expected NAME=VALUE, got `{s}`");
        };

        let name = name.trim();
        anyhow::ensure!(!name.is_empty(), "variable name must not be empty");

        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    /// Format used with --print
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn var_values() {
        let var: VarArg = "user_names=[\"peanut\"]".parse().unwrap();
        assert_eq!(var.name, "user_names");
        assert_eq!(var.value, serde_json::json!(["peanut"]));

        let var: VarArg = "group_name=dogs".parse().unwrap();
        assert_eq!(var.value, serde_json::json!("dogs"));

        let var: VarArg = "expression=a=b".parse().unwrap();
        assert_eq!(var.name, "expression");
        assert_eq!(var.value, serde_json::json!("a=b"));

        assert!("no_value".parse::<VarArg>().is_err());
        assert!("=dogs".parse::<VarArg>().is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
