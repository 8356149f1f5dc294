use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Instrument, debug, info_span};

use crate::{
    context::Context,
    error::{GraphError, Result},
    task::{NextAction, Task, TaskResult},
};

/// Edge between tasks in the graph
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A graph of tasks that can be executed
pub struct Graph {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    edges: Vec<Edge>,
    start_task_id: Option<String>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            edges: Vec::new(),
            start_task_id: None,
        }
    }

    /// Add a task to the graph
    pub fn add_task(&mut self, task: Arc<dyn Task>) -> &mut Self {
        let task_id = task.id().to_string();

        // The first task becomes the start task
        if self.tasks.is_empty() {
            self.start_task_id = Some(task_id.clone());
        }
        self.tasks.insert(task_id, task);
        self
    }

    /// Set the starting task
    pub fn set_start_task(&mut self, task_id: impl Into<String>) -> &mut Self {
        let task_id = task_id.into();
        if self.tasks.contains_key(&task_id) {
            self.start_task_id = Some(task_id);
        }
        self
    }

    /// Add an edge between tasks
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Run the graph from its start task until a task ends it or no edge leads on.
    pub async fn execute(&self, context: Context) -> Result<ExecutionResult> {
        let mut current = self.start_task_id.clone().ok_or(GraphError::NoStartTask)?;
        let mut steps = Vec::new();

        loop {
            let result = self.execute_single_task(&current, context.clone()).await?;
            steps.push(result.task_id.clone());

            match result.next_action {
                NextAction::Continue => match self.find_next_task(&result.task_id) {
                    Some(next_task_id) => current = next_task_id,
                    None => {
                        return Ok(ExecutionResult {
                            response: result.response,
                            steps,
                        });
                    }
                },
                NextAction::End => {
                    return Ok(ExecutionResult {
                        response: result.response,
                        steps,
                    });
                }
            }
        }
    }

    /// Execute a single task without following its next action
    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        let span = info_span!("task", graph_id = %self.id, task_id = %task_id);
        let mut result = task.run(context).instrument(span).await?;

        // Set the task_id in the result to track which task generated it
        result.task_id = task_id.to_string();

        if let Some(status) = &result.status_message {
            debug!(task_id = %task_id, status = %status, "Task finished");
        }

        Ok(result)
    }

    /// Find the next task based on edges
    pub fn find_next_task(&self, current_task_id: &str) -> Option<String> {
        self.edges
            .iter()
            .find(|edge| edge.from == current_task_id)
            .map(|edge| edge.to.clone())
    }

    /// Get the start task ID
    pub fn start_task_id(&self) -> Option<&str> {
        self.start_task_id.as_deref()
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.graph.add_task(task);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn set_start_task(mut self, task_id: impl Into<String>) -> Self {
        self.graph.set_start_task(task_id);
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Outcome of a completed graph run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    /// Ids of the tasks that ran, in order
    pub steps: Vec<String>,
}

