//! Pipeline graph definition and compilation.
//!
//! A [`PipelineGraph`] is a registry of named [`Stage`]s, a set of directed
//! edges, one entry stage and one terminal stage. [`PipelineGraph::compile`]
//! validates the wiring once, at startup, and produces an immutable
//! [`CompiledPipeline`]: the resolved entry-to-terminal chain. Wiring mistakes
//! therefore surface as [`GraphValidationError`] before any invocation, never
//! as runtime failures.
//!
//! Only single chains are executable: every non-terminal stage needs exactly
//! one outgoing edge, and the terminal stage needs none.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{GraphError, GraphValidationError};
use crate::ports::Stage;
use crate::state::StateRecord;
use crate::{PipelineName, StageName};

/// Mutable builder for a pipeline.
pub struct PipelineGraph<S: StateRecord> {
    name: PipelineName,
    stages: Vec<(StageName, Arc<dyn Stage<S>>)>,
    edges: Vec<(StageName, StageName)>,
    entry: Option<StageName>,
    terminal: Option<StageName>,
}

impl<S: StateRecord> PipelineGraph<S> {
    /// Creates an empty graph.
    pub fn new(name: PipelineName) -> Self {
        Self {
            name,
            stages: Vec::new(),
            edges: Vec::new(),
            entry: None,
            terminal: None,
        }
    }

    /// Adds a named stage.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateStage`] if `name` is already registered;
    /// [`GraphError::EmptyName`] if `name` is empty.
    pub fn register(
        &mut self,
        name: &str,
        stage: impl Stage<S> + 'static,
    ) -> Result<&mut Self, GraphError> {
        let name = StageName::new(name).ok_or(GraphError::EmptyName)?;
        if self.position(name.as_str()).is_some() {
            return Err(GraphError::DuplicateStage {
                name: name.to_string(),
            });
        }
        self.stages.push((name, Arc::new(stage)));
        Ok(self)
    }

    /// Adds a directed edge `from -> to`.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownStage`] if either endpoint is unregistered.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<&mut Self, GraphError> {
        let from = self.registered(from)?;
        let to = self.registered(to)?;
        self.edges.push((from, to));
        Ok(self)
    }

    /// Designates the stage execution starts at.
    pub fn set_entry(&mut self, name: &str) -> Result<&mut Self, GraphError> {
        self.entry = Some(self.registered(name)?);
        Ok(self)
    }

    /// Designates the stage after which execution stops.
    pub fn set_terminal(&mut self, name: &str) -> Result<&mut Self, GraphError> {
        self.terminal = Some(self.registered(name)?);
        Ok(self)
    }

    /// Validates the graph and resolves it into an executable chain.
    ///
    /// # Errors
    ///
    /// Returns [`GraphValidationError`] if the entry or terminal is unset, a
    /// stage branches, the walk from the entry hits a dead end or a cycle, the
    /// terminal has an outgoing edge, or a registered stage is off the chain.
    pub fn compile(&self) -> Result<CompiledPipeline<S>, GraphValidationError> {
        let entry = self.entry.clone().ok_or(GraphValidationError::EntryUnset)?;
        let terminal = self
            .terminal
            .clone()
            .ok_or(GraphValidationError::TerminalUnset)?;

        for (stage, _) in &self.stages {
            let targets = self.targets_of(stage);
            if *stage == terminal {
                if let Some(target) = targets.first() {
                    return Err(GraphValidationError::TerminalHasEdge {
                        stage: stage.clone(),
                        target: (*target).clone(),
                    });
                }
            } else if targets.len() > 1 {
                return Err(GraphValidationError::Branching {
                    stage: stage.clone(),
                    targets: targets.into_iter().cloned().collect(),
                });
            }
        }

        let mut path = vec![entry.clone()];
        let mut visited = HashSet::from([entry.clone()]);
        let mut current = entry;
        while current != terminal {
            let next = match self.targets_of(&current).first() {
                Some(next) => (*next).clone(),
                None => return Err(GraphValidationError::DeadEnd { stage: current }),
            };
            path.push(next.clone());
            if !visited.insert(next.clone()) {
                return Err(GraphValidationError::Cycle { path });
            }
            current = next;
        }

        if let Some((stranded, _)) = self.stages.iter().find(|(n, _)| !visited.contains(n)) {
            return Err(GraphValidationError::Unreachable {
                stage: stranded.clone(),
            });
        }

        let chain = path
            .into_iter()
            .filter_map(|name| {
                let (_, stage) = self.stages.iter().find(|(n, _)| *n == name)?;
                Some(CompiledStage {
                    name,
                    stage: Arc::clone(stage),
                })
            })
            .collect::<Arc<[CompiledStage<S>]>>();

        debug!(pipeline = %self.name, stages = chain.len(), "pipeline compiled");

        Ok(CompiledPipeline {
            name: self.name.clone(),
            chain,
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|(n, _)| n.as_str() == name)
    }

    fn registered(&self, name: &str) -> Result<StageName, GraphError> {
        self.position(name)
            .map(|i| self.stages[i].0.clone())
            .ok_or_else(|| GraphError::UnknownStage {
                name: name.to_owned(),
            })
    }

    fn targets_of(&self, stage: &StageName) -> Vec<&StageName> {
        self.edges
            .iter()
            .filter(|(from, _)| from == stage)
            .map(|(_, to)| to)
            .collect()
    }
}

/// One resolved step of a [`CompiledPipeline`].
pub struct CompiledStage<S: StateRecord> {
    name: StageName,
    stage: Arc<dyn Stage<S>>,
}

impl<S: StateRecord> CompiledStage<S> {
    pub fn name(&self) -> &StageName {
        &self.name
    }

    pub fn stage(&self) -> &dyn Stage<S> {
        self.stage.as_ref()
    }
}

impl<S: StateRecord> Clone for CompiledStage<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            stage: Arc::clone(&self.stage),
        }
    }
}

/// An immutable, validated chain of stages.
///
/// Read-only after compilation and cheap to clone, so one instance can serve
/// any number of concurrent invocations without locking.
pub struct CompiledPipeline<S: StateRecord> {
    name: PipelineName,
    chain: Arc<[CompiledStage<S>]>,
}

impl<S: StateRecord> CompiledPipeline<S> {
    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    /// Stages in execution order, entry first and terminal last.
    pub fn stages(&self) -> &[CompiledStage<S>] {
        &self.chain
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &StageName> + '_ {
        self.chain.iter().map(CompiledStage::name)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always `false`: compilation requires an entry stage.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl<S: StateRecord> Clone for CompiledPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<S: StateRecord> std::fmt::Debug for CompiledPipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names().collect::<Vec<_>>())
            .finish()
    }
}
