mod cli;
mod project;

use indexmap::IndexMap;
use std::path::PathBuf;
use tfrender::render::{Contents, Renderer};
use tfrender::variables::VariableValue;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFRENDER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Render(render_cli) => render(render_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn render(cli: cli::RenderCommand) -> anyhow::Result<()> {
    let mut renderer = Renderer::new(project::files());
    for var in cli.vars {
        tracing::debug!(name = %var.name, "variable from command line");
        renderer = renderer.with_value(VariableValue::new(var.name, var.value, "cli"))?;
    }

    let rendered = renderer.render()?;

    if cli.print {
        return output(&cli.output, &rendered);
    }

    let written = tfrender::render::write_files(&cli.output_dir, &rendered)?;
    for path in written {
        println!("{}", path.display());
    }

    Ok(())
}

fn output(output: &cli::OutputArgs, rendered: &IndexMap<PathBuf, Contents>) -> anyhow::Result<()> {
    let files = printable(rendered)?;

    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &files)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &files)?,
    };

    Ok(())
}

/// Rendered files keyed by path, in the order (and with the body order) they are written
fn printable(
    rendered: &IndexMap<PathBuf, Contents>,
) -> tfrender::Result<IndexMap<String, &Contents>> {
    let mut files = IndexMap::new();
    for (path, contents) in rendered {
        contents.ensure_renderable()?;
        files.insert(path.display().to_string(), contents);
    }
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tfrender::block::Block;
    use tfrender::producer::{producer, Co};

    #[test]
    fn printed_files_keep_body_order() {
        let main = producer(|co: Co, _var| async move {
            co.emit(
                Block::new("resource.aws_iam_user.peanut")
                    .with("path", "/")
                    .with("name", "peanut"),
            )
            .await?;
            Ok(())
        });
        let rendered = Renderer::new(vec![("main.tf", main)]).render().unwrap();

        let json = serde_json::to_string(&printable(&rendered).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"main.tf.json":[{"resource":{"aws_iam_user":{"peanut":{"path":"/","name":"peanut"}}}}]}"#
        );
    }

    #[test]
    fn demo_project_renders() {
        let rendered = Renderer::new(project::files()).render().unwrap();
        let files: Vec<_> = printable(&rendered).unwrap().into_keys().collect();
        assert_eq!(files, vec!["variables.tf.json", "terraform.tfvars.json", "iam.tf.json"]);
    }
}
