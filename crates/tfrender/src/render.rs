//! Rendering a set of files
//!
//! Each file to create is a [RenderJob] driving one producer. The [Renderer] keeps pending jobs on
//! a stack, advances the top one by a single step and pushes it back until it is done.
//!
//! Jobs are not independent: reading a variable may need another file to be rendered first. The
//! job queue is attached to the [VariableStore] as its [Scheduler], so a read can advance other
//! jobs (re-entrantly, from inside the reading job's step) until the value is available.
//!
//! Variable definitions files (output name ending in `.tfvars.json`) are special: their blocks are
//! flat `name → value` mappings, merged into a single object when rendered, and their values feed
//! the store while somebody waits for the file. Only files the provisioning tool loads by itself
//! (`terraform.tfvars.json`, `*.auto.tfvars.json`) are waited for.
use crate::error::Result;
use crate::producer::{unwrap_yielded, Generator, Producer, ProducerFn, Yielded};
use crate::util;
use crate::value::{self, Mapping};
use crate::variables::{definitions_from_block, Scheduler, Until, VariableStore, VariableValue};
use crate::visit::{Location, Visit, VisitValues};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Rendered contents of one file
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    /// Flattened blocks in emission order
    Blocks(Vec<Mapping>),
    /// Merged variable values
    Values(Mapping),
}

impl Contents {
    /// Fails with [crate::Error::Unrenderable] if any value has no textual form
    pub fn ensure_renderable(&self) -> Result<()> {
        value::ensure_renderable(self, &mut Location::default())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.ensure_renderable()?;
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        self.ensure_renderable()?;
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl VisitValues for Contents {
    fn visit_values(&self, location: &mut Location, visitor: &mut dyn Visit<value::Value>) {
        match self {
            Contents::Blocks(blocks) => blocks.visit_values(location, visitor),
            Contents::Values(values) => values.visit_values(location, visitor),
        }
    }
}

impl Serialize for Contents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Contents::Blocks(blocks) => blocks.serialize(serializer),
            Contents::Values(values) => values.serialize(serializer),
        }
    }
}

/// Produces one file
pub struct RenderJob {
    path: PathBuf,
    variables: VariableStore,
    producer: Box<dyn Producer>,
    done: bool,
    output_path: PathBuf,
    output_name: String,
    blocks: Vec<Mapping>,
    /// Sent back into the producer on the next step
    return_value: Option<Yielded>,
}

impl RenderJob {
    pub fn new(path: PathBuf, producer: &ProducerFn, variables: VariableStore) -> Self {
        let output_path = util::output_path_for(&path);
        let output_name = util::file_name(&output_path);

        let var = variables.proxy(output_name.clone());
        let producer = Box::new(Generator::new(output_name.clone(), producer, var));

        Self {
            path,
            variables,
            producer,
            done: false,
            output_path,
            output_name,
            blocks: vec![],
            return_value: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn is_tfvars(&self) -> bool {
        util::is_tfvars(&self.output_name)
    }

    pub fn contents(&self) -> Contents {
        if self.is_tfvars() {
            let mut merged = Mapping::new();
            for block in &self.blocks {
                for (name, value) in block {
                    merged.insert(name.clone(), value.clone());
                }
            }
            Contents::Values(merged)
        } else {
            Contents::Blocks(self.blocks.clone())
        }
    }

    fn process_tf_block(&self, block: &Mapping) -> Result<()> {
        let source = self.path.display().to_string();
        for definition in definitions_from_block(block, &source) {
            // a definition alone does not make the value available,
            // a variable definitions file may still set it
            self.variables.add(definition, true)?;
        }
        Ok(())
    }

    fn process_tfvars_block(&self, block: &Mapping) -> Result<()> {
        // values nobody waits for are only recorded in the file
        if !self.variables.tfvars_waiting_for(&self.output_name) {
            tracing::trace!(file = %self.output_name, "values not waited for");
            return Ok(());
        }

        for (name, value) in block {
            // the value must not change, the provisioning tool would read the new one
            // while this render may have used the old one already
            let var = VariableValue::new(name.as_str(), value.clone(), self.output_name.as_str());
            self.variables.add(var, false)?;
        }
        Ok(())
    }

    /// Advance the producer by one step
    ///
    /// Returns whether the job is done.
    #[tracing::instrument(level = "trace", skip_all, fields(file = %self.output_name))]
    pub fn run(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }

        let Some(yielded) = self.producer.resume(self.return_value.take())? else {
            self.done = true;
            self.variables.file_created(&self.output_name);
            return Ok(true);
        };

        for block in unwrap_yielded(&yielded) {
            if self.is_tfvars() {
                self.process_tfvars_block(&block)?;
            } else {
                self.process_tf_block(&block)?;
            }

            self.blocks.push(block);
        }

        self.return_value = Some(yielded);
        Ok(false)
    }
}

impl std::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJob")
            .field("path", &self.path)
            .field("output_path", &self.output_path)
            .field("done", &self.done)
            .field("blocks", &self.blocks.len())
            .finish_non_exhaustive()
    }
}

/// Pending and finished jobs
struct JobQueue {
    /// Stack, the last pushed job is advanced first
    jobs: RefCell<Vec<RenderJob>>,
    /// In completion order
    done: RefCell<Vec<RenderJob>>,
    variables: VariableStore,
}

impl JobQueue {
    fn process_jobs(&self, until: Option<&Until>) -> Result<()> {
        loop {
            if let Some(until) = until {
                if self.variables.is_satisfied(until) {
                    tracing::trace!(?until, "satisfied");
                    break;
                }
            }

            // the stack must not stay borrowed while the job runs, it may process jobs itself
            let next = self.jobs.borrow_mut().pop();
            let Some(mut job) = next else {
                break;
            };

            if job.run()? {
                tracing::debug!(file = %job.output_name, "job done");
                self.done.borrow_mut().push(job);
            } else {
                self.jobs.borrow_mut().push(job);
            }
        }

        Ok(())
    }
}

impl Scheduler for JobQueue {
    fn run_until(&self, until: &Until) -> Result<()> {
        self.process_jobs(Some(until))
    }

    fn is_pending(&self, output_name: &str) -> bool {
        self.jobs
            .borrow()
            .iter()
            .any(|job| job.output_name == output_name)
    }
}

/// Renders a set of files that may depend on each other's variables
pub struct Renderer {
    queue: Rc<JobQueue>,
}

impl Renderer {
    /// One job per `(source path, producer)`, registration order is kept
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, ProducerFn)>,
        P: Into<PathBuf>,
    {
        let files: Vec<(PathBuf, ProducerFn)> = files
            .into_iter()
            .map(|(path, producer)| (path.into(), producer))
            .collect();

        let variables = VariableStore::for_files(
            files
                .iter()
                .map(|(path, _)| util::file_name(&util::output_path_for(path))),
        );

        let jobs = files
            .iter()
            .map(|(path, producer)| RenderJob::new(path.clone(), producer, variables.clone()))
            .collect();

        let queue = Rc::new(JobQueue {
            jobs: RefCell::new(jobs),
            done: RefCell::default(),
            variables: variables.clone(),
        });

        let scheduler: Weak<JobQueue> = Rc::downgrade(&queue);
        variables.attach(scheduler);

        Self { queue }
    }

    /// Seed an externally supplied value, e.g. from the command line
    pub fn with_value(self, value: VariableValue) -> Result<Self> {
        self.queue.variables.add(value, true)?;
        Ok(self)
    }

    pub fn variables(&self) -> &VariableStore {
        &self.queue.variables
    }

    /// Advance jobs until `until` holds, or all of them when `None`
    pub fn process_jobs(&self, until: Option<&Until>) -> Result<()> {
        self.queue.process_jobs(until)
    }

    /// Render every file, keyed by output path in completion order
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn render(self) -> Result<IndexMap<PathBuf, Contents>> {
        self.queue.process_jobs(None)?;

        let done = self.queue.done.take();
        tracing::info!(files = done.len(), "rendered");
        Ok(done
            .into_iter()
            .map(|job| {
                let contents = job.contents();
                (job.output_path, contents)
            })
            .collect())
    }
}

/// Write rendered files below `directory` as pretty printed json
///
/// Every file is checked before anything is written.
pub fn write_files(
    directory: &Path,
    rendered: &IndexMap<PathBuf, Contents>,
) -> Result<Vec<PathBuf>> {
    for (path, contents) in rendered {
        let mut location = Location::default();
        location.push(path.display());
        value::ensure_renderable(contents, &mut location)?;
    }

    let mut written = vec![];
    for (path, contents) in rendered {
        let target = directory.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut json = contents.to_json_string_pretty()?;
        json.push('\n');
        std::fs::write(&target, json)?;

        tracing::info!(path = %target.display(), "file written");
        written.push(target);
    }

    Ok(written)
}
