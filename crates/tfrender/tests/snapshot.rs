//! Snapshot tests
//!
//! Renders the demo project from `common` and compares every file, in the order and with the
//! field order they are written.

mod common;

#[test]
fn demo_project() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFRENDER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let rendered = tfrender::render::Renderer::new(common::files())
        .render()
        .expect("must render");

    let rendered: indexmap::IndexMap<String, &tfrender::render::Contents> = rendered
        .iter()
        .map(|(path, contents)| {
            contents.ensure_renderable().expect("must be renderable");
            (path.display().to_string(), contents)
        })
        .collect();

    insta::assert_json_snapshot!(rendered);
}
