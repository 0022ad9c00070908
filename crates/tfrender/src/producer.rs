//! Producers: cooperative tasks that emit configuration
//!
//! A producer is written as an async function taking a [Co] handle and a [VariableProxy]:
//!
//! ```
//! use tfrender::{block::Block, producer::Co, variables::VariableProxy};
//!
//! async fn iam(co: Co, var: VariableProxy) -> tfrender::Result<()> {
//!     let name = var.get("name")?;
//!     let user = co.emit(Block::new(format!("resource.aws_iam_user.{name}")).with("name", name)).await?;
//!     co.emit(Block::new("output.arn").with("value", user.attr("arn"))).await?;
//!     Ok(())
//! }
//! ```
//!
//! Every `emit` suspends the producer. Whoever drives it (a collection factory or a render job)
//! processes the emitted item and resumes the producer, sending the item back so the producer can
//! continue with it.
//!
//! [Generator] adapts such a function to the [Producer] trait, the single "resume with value"
//! operation the drivers use.
use crate::block::Block;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::value::Mapping;
use crate::variables::VariableProxy;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Anything a producer can emit
#[derive(Debug, Clone, PartialEq)]
pub enum Yielded {
    Block(Block),
    /// A block that is already in its flattened shape
    Mapping(Mapping),
    Collection(Collection),
    Many(Vec<Yielded>),
}

impl From<Block> for Yielded {
    fn from(value: Block) -> Self {
        Yielded::Block(value)
    }
}

impl From<Mapping> for Yielded {
    fn from(value: Mapping) -> Self {
        Yielded::Mapping(value)
    }
}

impl From<Collection> for Yielded {
    fn from(value: Collection) -> Self {
        Yielded::Collection(value)
    }
}

impl<T: Into<Yielded>> From<Vec<T>> for Yielded {
    fn from(value: Vec<T>) -> Self {
        Yielded::Many(value.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Yielded> for Block {
    type Error = Yielded;

    fn try_from(value: Yielded) -> Result<Self, Self::Error> {
        match value {
            Yielded::Block(block) => Ok(block),
            other => Err(other),
        }
    }
}

impl TryFrom<Yielded> for Mapping {
    type Error = Yielded;

    fn try_from(value: Yielded) -> Result<Self, Self::Error> {
        match value {
            Yielded::Mapping(mapping) => Ok(mapping),
            other => Err(other),
        }
    }
}

impl TryFrom<Yielded> for Collection {
    type Error = Yielded;

    fn try_from(value: Yielded) -> Result<Self, Self::Error> {
        match value {
            Yielded::Collection(collection) => Ok(collection),
            other => Err(other),
        }
    }
}

/// Unwrap an emitted item into flattened blocks, in emission order
///
/// Collections contribute their ordinary blocks only.
pub fn unwrap_yielded(yielded: &Yielded) -> Vec<Mapping> {
    match yielded {
        Yielded::Block(block) => vec![block.flatten()],
        Yielded::Mapping(mapping) => vec![mapping.clone()],
        Yielded::Collection(collection) => collection.iter().cloned().collect(),
        Yielded::Many(items) => items.iter().flat_map(unwrap_yielded).collect(),
    }
}

/// Cooperative task with a single suspension point
pub trait Producer {
    /// Run until the next emitted item
    ///
    /// `sent` is handed to the pending `emit` as its result; it is `None` on the first call.
    /// Returns `None` once the producer has finished.
    fn resume(&mut self, sent: Option<Yielded>) -> Result<Option<Yielded>>;
}

/// Shareable producer function
pub type ProducerFn = Rc<dyn Fn(Co, VariableProxy) -> LocalBoxFuture<'static, Result<()>>>;

/// Box an async producer function
pub fn producer<F, Fut>(f: F) -> ProducerFn
where
    F: Fn(Co, VariableProxy) -> Fut + 'static,
    Fut: Future<Output = Result<()>> + 'static,
{
    Rc::new(move |co, var| f(co, var).boxed_local())
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Emitted(Yielded),
    Resumed(Yielded),
}

/// Handle a producer uses to emit items
#[derive(Debug, Clone, Default)]
pub struct Co {
    slot: Rc<RefCell<Slot>>,
}

impl Co {
    /// Emit `item` and wait for the driver to send it back
    pub async fn emit<T>(&self, item: T) -> Result<T>
    where
        T: Into<Yielded> + TryFrom<Yielded>,
    {
        *self.slot.borrow_mut() = Slot::Emitted(item.into());

        let sent = std::future::poll_fn(|_cx| {
            let mut slot = self.slot.borrow_mut();
            match std::mem::take(&mut *slot) {
                Slot::Resumed(sent) => Poll::Ready(sent),
                pending => {
                    *slot = pending;
                    Poll::Pending
                }
            }
        })
        .await;

        T::try_from(sent).map_err(|_| Error::UnexpectedResume {
            expected: std::any::type_name::<T>(),
        })
    }
}

/// [Producer] backed by an async producer function
pub struct Generator {
    name: String,
    co: Co,
    /// `None` once finished
    future: Option<LocalBoxFuture<'static, Result<()>>>,
}

impl Generator {
    /// Starts `producer` (without running it) with `var` as its variables
    pub fn new(name: impl Into<String>, producer: &ProducerFn, var: VariableProxy) -> Self {
        let co = Co::default();
        let future = producer(co.clone(), var);
        Self {
            name: name.into(),
            co,
            future: Some(future),
        }
    }
}

impl Producer for Generator {
    #[tracing::instrument(level = "trace", skip_all, fields(producer = %self.name))]
    fn resume(&mut self, sent: Option<Yielded>) -> Result<Option<Yielded>> {
        let Some(future) = self.future.as_mut() else {
            return Ok(None);
        };

        if let Some(sent) = sent {
            *self.co.slot.borrow_mut() = Slot::Resumed(sent);
        }

        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        match future.poll_unpin(&mut cx) {
            Poll::Ready(result) => {
                self.future = None;
                tracing::trace!(ok = result.is_ok(), "producer finished");
                result.map(|()| None)
            }
            Poll::Pending => {
                let emitted = std::mem::take(&mut *self.co.slot.borrow_mut());
                match emitted {
                    Slot::Emitted(yielded) => Ok(Some(yielded)),
                    _ => Err(Error::ProducerStalled {
                        producer: self.name.clone(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::variables::VariableStore;
    use pretty_assertions::assert_eq;

    fn generator(f: ProducerFn) -> Generator {
        Generator::new("test", &f, VariableStore::default().proxy("test"))
    }

    #[test]
    fn emit_returns_the_value_sent_back() {
        let mut gen = generator(producer(|co: Co, _var| async move {
            let user = co.emit(Block::new("resource.aws_iam_user.peanut")).await?;
            co.emit(Block::new("output.arn").with("value", user.attr("arn")))
                .await?;
            Ok(())
        }));

        let first = gen.resume(None).unwrap().expect("first block");
        assert_eq!(
            first,
            Yielded::Block(Block::new("resource.aws_iam_user.peanut"))
        );

        let second = gen.resume(Some(first)).unwrap().expect("second block");
        assert_eq!(
            second,
            Yielded::Block(Block::new("output.arn").with(
                "value",
                crate::block::Reference::new("aws_iam_user.peanut.arn")
            ))
        );

        assert_eq!(gen.resume(Some(second)).unwrap(), None);
        // finished producers stay finished
        assert_eq!(gen.resume(None).unwrap(), None);
    }

    #[test]
    fn empty_producer_finishes_immediately() {
        let mut gen = generator(producer(|_co, _var| async { Ok(()) }));
        assert_eq!(gen.resume(None).unwrap(), None);
    }

    #[test]
    fn mismatched_resume_value() {
        let mut gen = generator(producer(|co: Co, _var| async move {
            co.emit(Block::new("locals")).await?;
            Ok(())
        }));

        gen.resume(None).unwrap();
        let err = gen
            .resume(Some(Yielded::Mapping(Mapping::new())))
            .expect_err("must error");
        assert!(matches!(err, Error::UnexpectedResume { .. }));
    }

    #[test]
    fn resuming_without_value_stalls() {
        let mut gen = generator(producer(|co: Co, _var| async move {
            co.emit(Block::new("locals")).await?;
            Ok(())
        }));

        gen.resume(None).unwrap();
        let err = gen.resume(None).expect_err("must error");
        assert!(matches!(err, Error::ProducerStalled { .. }));
    }

    #[test]
    fn unwrap_nested_sequences_in_order() {
        let yielded = Yielded::from(vec![
            Yielded::from(Block::new("resource.a.one")),
            Yielded::from(vec![Block::new("resource.a.two"), Block::new("resource.a.three")]),
            Yielded::from(Block::new("resource.a.four").flatten()),
        ]);

        let labels: Vec<_> = unwrap_yielded(&yielded)
            .iter()
            .map(|block| {
                let resource = block["resource"].as_object().unwrap();
                let a = resource["a"].as_object().unwrap();
                a.keys().next().unwrap().clone()
            })
            .collect();

        assert_eq!(labels, vec!["one", "two", "three", "four"]);
    }
}
