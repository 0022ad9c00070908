//! Variable definitions, values and the store that resolves them
//!
//! Variables enter the [VariableStore] from several sources:
//! - definitions: `variable` blocks, optionally with a `default`
//! - values: keyword arguments of a collection, the command line, or generated
//!   variable definitions files (`*.tfvars.json`)
//!
//! An explicit value always wins over a definition's default.
//!
//! ### Waiting for values
//!
//! A store used by the [Renderer](crate::render::Renderer) has a [Scheduler] attached. Reading a
//! variable through a [VariableProxy] then may advance other render jobs until the value exists:
//!
//! 1. every variable definitions file that is still to be generated could set the value, so the
//!    store waits for each of them to be created ([Until::File]). Only while it waits for a file
//!    are that file's values accepted (see [VariableStore::tfvars_waiting_for]).
//! 2. if the value is still missing, jobs are advanced until it appears ([Until::Variable]).
//! 3. if nothing is left to advance the read fails with [Error::VariableNotPopulated].
//!
//! There is no cycle detection. A circular dependency runs out of jobs and ends up at 3.
use crate::error::{Error, Result};
use crate::util;
use crate::value::{Mapping, Value};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A declared variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub default: Option<Value>,
    /// Where the definition came from, for diagnostics
    pub source: String,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, default: Option<Value>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default,
            source: source.into(),
        }
    }
}

/// A concrete value for a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableValue {
    pub name: String,
    pub value: Value,
    /// Where the value came from, for diagnostics
    pub source: String,
}

impl VariableValue {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<Value>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Definition(VariableDefinition),
    Value(VariableValue),
}

impl From<VariableDefinition> for Variable {
    fn from(value: VariableDefinition) -> Self {
        Variable::Definition(value)
    }
}

impl From<VariableValue> for Variable {
    fn from(value: VariableValue) -> Self {
        Variable::Value(value)
    }
}

/// Extract the variable definitions of a flattened `variable` block
///
/// `{"variable": {"path": {"default": "/"}}}` defines `path` with a default of `"/"`.
pub fn definitions_from_block(block: &Mapping, source: &str) -> Vec<VariableDefinition> {
    let Some(Value::Object(variables)) = block.get("variable") else {
        return vec![];
    };

    variables
        .iter()
        .map(|(name, body)| {
            let default = body.as_object().and_then(|body| body.get("default")).cloned();
            VariableDefinition::new(name, default, source)
        })
        .collect()
}

/// Condition the scheduler runs towards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Until {
    /// The variable has a value (or a default)
    Variable(String),
    /// The file with this output name has been created
    File(String),
}

/// Drives pending work on behalf of the store
///
/// Implemented by the renderer's job queue. The store only holds it weakly.
pub trait Scheduler {
    /// Advance pending jobs until `until` holds or no job is left
    fn run_until(&self, until: &Until) -> Result<()>;

    /// Whether the job creating `output_name` is waiting to be advanced
    fn is_pending(&self, output_name: &str) -> bool;
}

#[derive(Default)]
struct StoreState {
    definitions: IndexMap<String, VariableDefinition>,
    values: IndexMap<String, VariableValue>,
    /// Output names of auto loaded variable definitions files that will be created
    tfvars_files: Vec<String>,
    files_created: IndexSet<String>,
    tfvars_waiting: IndexSet<String>,
    scheduler: Option<Weak<dyn Scheduler>>,
}

impl StoreState {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name).map(|var| &var.value).or_else(|| {
            self.definitions
                .get(name)
                .and_then(|definition| definition.default.as_ref())
        })
    }
}

/// Shared handle to the variables of one render or one collection
///
/// Cloning the handle does not copy the variables.
#[derive(Clone, Default)]
pub struct VariableStore {
    state: Rc<RefCell<StoreState>>,
}

impl VariableStore {
    /// Store for a render of `files_to_create` (output names)
    ///
    /// Variable definitions files the provisioning tool loads by itself (`terraform.tfvars.json`,
    /// `*.auto.tfvars.json`) are waited for before variables are read. Other variable definitions
    /// files are rendered but never a source of values.
    pub fn for_files<I, S>(files_to_create: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        store.state.borrow_mut().tfvars_files = files_to_create
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| util::is_auto_loaded_tfvars(name))
            .collect();
        store
    }

    /// Attach the scheduler used to wait for values
    pub fn attach(&self, scheduler: Weak<dyn Scheduler>) {
        self.state.borrow_mut().scheduler = Some(scheduler);
    }

    fn scheduler(&self) -> Option<Rc<dyn Scheduler>> {
        let weak = self.state.borrow().scheduler.clone();
        weak.and_then(|scheduler| scheduler.upgrade())
    }

    /// Register a definition or a value
    ///
    /// With `allow_change` unset, replacing an existing value with a different one fails.
    /// Numbers are compared by magnitude, see [Value::same_value].
    pub fn add(&self, var: impl Into<Variable>, allow_change: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match var.into() {
            Variable::Definition(definition) => {
                tracing::trace!(
                    name = %definition.name,
                    source = %definition.source,
                    "variable defined"
                );
                state
                    .definitions
                    .insert(definition.name.clone(), definition);
            }
            Variable::Value(value) => {
                if let Some(existing) = state.values.get(&value.name) {
                    if !allow_change && !existing.value.same_value(&value.value) {
                        return Err(Error::ConflictingVariableValue {
                            name: value.name,
                            old_source: existing.source.clone(),
                            new_source: value.source,
                        });
                    }
                }

                tracing::debug!(name = %value.name, source = %value.source, "variable value set");
                state.values.insert(value.name.clone(), value);
            }
        }

        Ok(())
    }

    /// Whether a value (or default) is available right now, without waiting
    pub fn contains(&self, name: &str) -> bool {
        self.state.borrow().lookup(name).is_some()
    }

    pub fn is_satisfied(&self, until: &Until) -> bool {
        match until {
            Until::Variable(name) => self.contains(name),
            Until::File(output_name) => self.state.borrow().files_created.contains(output_name),
        }
    }

    /// Whether values of the variable definitions file `output_name` are wanted right now
    pub fn tfvars_waiting_for(&self, output_name: &str) -> bool {
        self.state.borrow().tfvars_waiting.contains(output_name)
    }

    /// The job creating `output_name` has finished
    pub fn file_created(&self, output_name: &str) {
        tracing::debug!(file = %output_name, "file created");
        self.state
            .borrow_mut()
            .files_created
            .insert(output_name.to_string());
    }

    /// Read access for the producer `consumer`
    pub fn proxy(&self, consumer: impl Into<String>) -> VariableProxy {
        VariableProxy::new(self.clone(), consumer.into())
    }

    /// Resolve a value, waiting for other jobs if a scheduler is attached
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get(&self, name: &str, consumer: &str) -> Result<Value> {
        if let Some(scheduler) = self.scheduler() {
            for file in self.pending_tfvars_files(consumer, scheduler.as_ref()) {
                tracing::debug!(%file, "waiting for variable definitions file");
                self.state.borrow_mut().tfvars_waiting.insert(file.clone());
                let waited = scheduler.run_until(&Until::File(file.clone()));
                self.state.borrow_mut().tfvars_waiting.shift_remove(&file);
                waited?;
            }

            if !self.contains(name) {
                tracing::debug!("waiting for variable");
                scheduler.run_until(&Until::Variable(name.to_string()))?;
            }
        }

        self.state
            .borrow()
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::VariableNotPopulated {
                name: name.to_string(),
                consumer: consumer.to_string(),
            })
    }

    /// Variable definitions files that may still set values and can be run now
    fn pending_tfvars_files(&self, consumer: &str, scheduler: &dyn Scheduler) -> Vec<String> {
        let candidates: Vec<String> = {
            let state = self.state.borrow();
            state
                .tfvars_files
                .iter()
                .filter(|file| file.as_str() != consumer)
                .filter(|file| !state.files_created.contains(*file))
                .filter(|file| !state.tfvars_waiting.contains(*file))
                .cloned()
                .collect()
        };

        candidates
            .into_iter()
            .filter(|file| scheduler.is_pending(file))
            .collect()
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VariableStore")
            .field("definitions", &state.definitions)
            .field("values", &state.values)
            .field("files_created", &state.files_created)
            .finish_non_exhaustive()
    }
}

/// Variable access for one producer
#[derive(Clone, Debug, derive_new::new)]
pub struct VariableProxy {
    store: VariableStore,
    consumer: String,
}

impl VariableProxy {
    /// Current value of `name`, possibly advancing other jobs first
    pub fn get(&self, name: &str) -> Result<Value> {
        self.store.get(name, &self.consumer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    /// Name of the producer reading through this proxy
    pub fn consumer(&self) -> &str {
        &self.consumer
    }
}
