//! The demo project of the `tfrender` binary: IAM collections and the files using them
#![allow(dead_code)]

#[path = "../../src/bin/tfrender/project.rs"]
mod project;

pub use project::*;
