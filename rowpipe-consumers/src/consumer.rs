//! Shared consumer lifecycle over an owned execution tree

use std::sync::Arc;

use tracing::{debug, info};

use rowpipe_core::{
    DatasetDescription, Epochs, Error, ExecutionTree, PipelineMetadata, Result, RowSchema,
    TreeAdapter,
};

/// Lifecycle of a consumer's binding to its execution tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No tree bound yet
    Unbound,

    /// Tree bound and launched
    Bound,

    /// Output mode finished; the tree is still owned
    Draining,

    /// Tree stopped and released
    Terminated,
}

/// Operations shared by every consumer variant
pub trait Consumer {
    /// Short name used in logs and error context
    fn name(&self) -> &'static str;

    /// Bind the consumer to the pipeline a description declares
    ///
    /// Builds and launches the execution tree. Exactly one tree is
    /// bound per consumer; a second call fails with
    /// [`Error::AlreadyInitialized`].
    fn initialize(&mut self, description: DatasetDescription) -> Result<()>;

    /// Stop the tree and release every held resource; idempotent
    fn shutdown(&mut self) -> Result<()>;

    /// Current lifecycle state
    fn state(&self) -> LifecycleState;
}

/// State every consumer variant composes over
///
/// Variants stay independent types with only the operations their
/// output mode supports; the shared tree ownership and lifecycle
/// bookkeeping live here.
pub struct ConsumerCore {
    /// Consumer name for logs and error context
    name: &'static str,

    /// The owned execution tree, present between bind and shutdown
    tree: Option<Box<dyn ExecutionTree>>,

    /// Current lifecycle state
    state: LifecycleState,
}

impl ConsumerCore {
    /// Create an unbound core for a named consumer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tree: None,
            state: LifecycleState::Unbound,
        }
    }

    /// Get the consumer name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Build, launch, and take ownership of the described tree
    pub fn bind(&mut self, description: DatasetDescription, epochs: Epochs) -> Result<()> {
        if self.state != LifecycleState::Unbound {
            return Err(Error::AlreadyInitialized(format!(
                "{} consumer is already bound to a tree",
                self.name
            )));
        }

        let mut tree = TreeAdapter::build(description, epochs)?;
        tree.launch()?;
        self.tree = Some(tree);
        self.state = LifecycleState::Bound;
        info!(consumer = self.name, "consumer bound to execution tree");

        Ok(())
    }

    /// Borrow the bound tree mutably
    pub fn tree_mut(&mut self) -> Result<&mut dyn ExecutionTree> {
        match self.tree.as_deref_mut() {
            Some(tree) => Ok(tree),
            None => Err(Error::NotStarted(format!(
                "{} consumer has no bound tree",
                self.name
            ))),
        }
    }

    /// Move the bound tree out, leaving the core in charge of state only
    pub fn take_tree(&mut self) -> Result<Box<dyn ExecutionTree>> {
        self.tree.take().ok_or_else(|| {
            Error::NotStarted(format!("{} consumer has no bound tree", self.name))
        })
    }

    /// Get the schema of the bound tree
    pub fn schema(&self) -> Result<Arc<RowSchema>> {
        match self.tree.as_ref() {
            Some(tree) => Ok(tree.schema()),
            None => Err(Error::NotStarted(format!(
                "{} consumer has no bound tree",
                self.name
            ))),
        }
    }

    /// Get the static metadata of the bound tree
    pub fn metadata(&self) -> Result<&PipelineMetadata> {
        match self.tree.as_ref() {
            Some(tree) => Ok(tree.metadata()),
            None => Err(Error::NotStarted(format!(
                "{} consumer has no bound tree",
                self.name
            ))),
        }
    }

    /// Record that the output mode has delivered everything it will
    pub fn mark_draining(&mut self) {
        if self.state == LifecycleState::Bound {
            self.state = LifecycleState::Draining;
            debug!(consumer = self.name, "consumer drained");
        }
    }

    /// Stop and release the tree; idempotent
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == LifecycleState::Terminated {
            return Ok(());
        }

        if let Some(mut tree) = self.tree.take() {
            tree.stop()?;
        }
        self.state = LifecycleState::Terminated;
        info!(consumer = self.name, "consumer shut down");

        Ok(())
    }
}
