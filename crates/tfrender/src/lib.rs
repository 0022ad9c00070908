//! # tfrender - configuration as code, rendered to terraform json
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfrender` works internally.
//!
//! ### Terms
//!
//! - a **block** ([block::Block]) is a configuration fragment with a dotted path and a body, e.g.
//!   `resource.aws_iam_user.peanut` with `{ name = "peanut" }`
//! - a **reference** ([block::Reference]) stands in for a value the provisioning tool computes
//!   later, e.g. `${aws_iam_user.peanut.arn}`
//! - a **producer** is an async function that emits blocks one at a time
//! - a **collection** ([collection::Collection]) groups the blocks of one producer run, with
//!   inputs (`variable` blocks) and outputs (`output` blocks), much like a module
//! - a **variable definitions file** is an output file ending in `.tfvars.json`, holding plain
//!   `name → value` data
//!
//! ### Producers
//!
//! see [producer]
//!
//! A producer gets a [producer::Co] handle to emit items and a [variables::VariableProxy] to read
//! variables:
//!
//! ```
//! use tfrender::{block::Block, producer::Co, variables::VariableProxy};
//!
//! async fn users(co: Co, var: VariableProxy) -> tfrender::Result<()> {
//!     co.emit(Block::new("variable.user_name")).await?;
//!
//!     let name = var.get("user_name")?;
//!     let user = co
//!         .emit(Block::new(format!("resource.aws_iam_user.{name}")).with("name", name))
//!         .await?;
//!
//!     co.emit(Block::new("output.arn").with("value", user.attr("arn"))).await?;
//!     Ok(())
//! }
//! ```
//!
//! Emitting suspends the producer and hands the item to whoever drives it. The driver sends the
//! item back when resuming, which is how `user` above becomes usable.
//!
//! ### Collections
//!
//! see [collection::collect]
//!
//! Collections run synchronously inside a producer. Calling a collection factory runs its producer
//! to completion with keyword arguments as variable values, and the resulting collection can be
//! emitted like a block. The outer producer only sees the ordinary blocks:
//!
//! | **emitted by the collection producer** | **ends up in**             |
//! |----------------------------------------|----------------------------|
//! | `variable.*`                           | the collection's variables |
//! | `output.*`                             | [collection::Collection::output] |
//! | anything else                          | the collection's blocks    |
//!
//! ### Rendering
//!
//! see [render::Renderer]
//!
//! The renderer runs one [render::RenderJob] per file. Jobs are advanced one step at a time, the
//! most recently registered first. All jobs share one [variables::VariableStore].
//!
//! Files may depend on each other: `iam.tf` reads `var.user_names`, `variables.tf` defines it and
//! `terraform.tfvars` sets it. When a producer reads a variable that is not available yet, the
//! store advances the other jobs (from inside the read) until it is. If there is nothing left to
//! advance, the read fails with [Error::VariableNotPopulated].
//!
//! ### Output
//!
//! Rendered files are a list of flattened blocks, or a single merged object for variable
//! definitions files. References are serialized as their `${...}` text, see [value::Value].
//!
pub mod block;
pub mod collection;
mod error;
pub mod producer;
pub mod render;
mod util;
pub mod value;
pub mod variables;
mod visit;

pub use error::{Error, Result};
