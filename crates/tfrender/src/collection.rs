//! Collections: reusable groups of blocks, similar to modules
//!
//! [collect] turns a producer function into a [CollectionFactory]. Calling the factory runs the
//! producer to completion with the given keyword arguments as its variables and returns a
//! [Collection]:
//!
//! - `variable` blocks declare inputs (optionally with a default)
//! - `output` blocks declare outputs, available through [Collection::output]
//! - every other block is part of the collection and gets rendered wherever the collection is
//!   emitted
//!
//! Unlike modules of the provisioning tool, the blocks are rendered in place rather than under a
//! module namespace.
//!
//! ```
//! use tfrender::{block::Block, collection::collect, kwargs, producer::Co, variables::VariableProxy};
//!
//! let iam_user = collect("iam_user", |co: Co, var: VariableProxy| async move {
//!     co.emit(Block::new("variable.name")).await?;
//!     let name = var.get("name")?;
//!     let user = co.emit(Block::new(format!("resource.aws_iam_user.{name}")).with("name", name)).await?;
//!     co.emit(Block::new("output.resource").with("value", user)).await?;
//!     Ok(())
//! });
//!
//! let peanut = iam_user.call(kwargs! { "name" => "peanut" }).unwrap();
//! let user = peanut.output("resource").unwrap().as_block().unwrap();
//! assert_eq!(user.attr("arn"), "${aws_iam_user.peanut.arn}");
//! assert_eq!(peanut.iter().count(), 1);
//! ```
use crate::error::{Error, Result};
use crate::producer::{producer, unwrap_yielded, Co, Generator, Producer, ProducerFn};
use crate::value::{Mapping, Value};
use crate::variables::{definitions_from_block, VariableProxy, VariableStore, VariableValue};
use std::future::Future;

/// Keyword arguments for [CollectionFactory::call]
///
/// ```
/// # use tfrender::{kwargs, value::Value};
/// let kwargs = kwargs! {
///     "group_name" => "dogs",
///     "user_names" => vec!["peanut", "cornelius"],
/// };
/// assert_eq!(kwargs[0], ("group_name".to_string(), Value::from("dogs")));
/// ```
#[macro_export]
macro_rules! kwargs {
    { $($name:expr => $value:expr),* $(,)? } => {{
        let kwargs: ::std::vec::Vec<(::std::string::String, $crate::value::Value)> = ::std::vec![
            $((::std::string::ToString::to_string(&$name), $crate::value::Value::from($value))),*
        ];
        kwargs
    }};
}

/// Ordinary part of a collection
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionItem {
    /// A flattened block
    Block(Mapping),
    Collection(Collection),
}

impl CollectionItem {
    fn blocks(&self) -> Box<dyn Iterator<Item = &Mapping> + '_> {
        match self {
            CollectionItem::Block(block) => Box::new(std::iter::once(block)),
            CollectionItem::Collection(collection) => collection.iter(),
        }
    }
}

/// Blocks and outputs produced by one run of a collection factory
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    items: Vec<CollectionItem>,
    outputs: Mapping,
}

impl Collection {
    pub fn new(name: impl Into<String>, items: Vec<CollectionItem>, outputs: Mapping) -> Self {
        Self {
            name: name.into(),
            items,
            outputs,
        }
    }

    /// Name of the factory that produced this collection
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a declared output
    pub fn output(&self, name: &str) -> Result<&Value> {
        self.outputs.get(name).ok_or_else(|| Error::OutputNotDefined {
            name: name.to_string(),
            collection: self.name.clone(),
        })
    }

    pub fn outputs(&self) -> &Mapping {
        &self.outputs
    }

    /// Ordinary blocks in yield order, nested collections flattened in place
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Mapping> + '_> {
        Box::new(self.items.iter().flat_map(CollectionItem::blocks))
    }

    /// The ordinary blocks as json
    ///
    /// Fails with [Error::Unrenderable] if any block contains a value without textual form.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.iter()
            .map(|block| Value::Object(block.clone()).to_json())
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Mapping;
    type IntoIter = Box<dyn Iterator<Item = &'a Mapping> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// What a flattened block means to a collection
enum BlockKind {
    Variable,
    Output,
    Ordinary,
}

impl BlockKind {
    fn of(block: &Mapping) -> Self {
        match block.keys().next().map(String::as_str) {
            Some("variable") => BlockKind::Variable,
            Some("output") => BlockKind::Output,
            _ => BlockKind::Ordinary,
        }
    }
}

/// Extract `(name, value)` pairs of a flattened `output` block
///
/// An output without `value` is null.
pub fn outputs_from_block(block: &Mapping) -> Vec<(String, Value)> {
    let Some(Value::Object(outputs)) = block.get("output") else {
        return vec![];
    };

    outputs
        .iter()
        .map(|(name, body)| {
            let value = body
                .as_object()
                .and_then(|body| body.get("value"))
                .cloned()
                .unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect()
}

/// Creates collections from a producer function
#[derive(Clone)]
pub struct CollectionFactory {
    name: String,
    producer: ProducerFn,
}

/// Turn `f` into a [CollectionFactory]; `name` identifies it in diagnostics
pub fn collect<F, Fut>(name: impl Into<String>, f: F) -> CollectionFactory
where
    F: Fn(Co, VariableProxy) -> Fut + 'static,
    Fut: Future<Output = Result<()>> + 'static,
{
    CollectionFactory {
        name: name.into(),
        producer: producer(f),
    }
}

impl CollectionFactory {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the producer with `kwargs` as variable values
    ///
    /// Every variable the producer reads without a default must be passed, otherwise this fails
    /// with [Error::VariableNotPopulated].
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub fn call<K, V>(&self, kwargs: impl IntoIterator<Item = (K, V)>) -> Result<Collection>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let variables = VariableStore::default();
        for (name, value) in kwargs {
            variables.add(VariableValue::new(name, value, "kwargs"), true)?;
        }

        let mut generator = Generator::new(
            self.name.clone(),
            &self.producer,
            variables.proxy(self.name.clone()),
        );

        let mut items = vec![];
        let mut outputs = Mapping::new();
        let mut sent = None;

        while let Some(yielded) = generator.resume(sent.take())? {
            for block in unwrap_yielded(&yielded) {
                match BlockKind::of(&block) {
                    BlockKind::Variable => {
                        for definition in definitions_from_block(&block, &self.name) {
                            variables.add(definition, true)?;
                        }
                    }
                    BlockKind::Output => {
                        for (name, value) in outputs_from_block(&block) {
                            tracing::trace!(%name, "output");
                            outputs.insert(name, value);
                        }
                    }
                    BlockKind::Ordinary => items.push(CollectionItem::Block(block)),
                }
            }

            sent = Some(yielded);
        }

        tracing::debug!(blocks = items.len(), outputs = outputs.len(), "collected");
        Ok(Collection::new(self.name.clone(), items, outputs))
    }
}

impl std::fmt::Debug for CollectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
