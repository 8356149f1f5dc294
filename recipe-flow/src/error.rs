use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Graph has no start task")]
    NoStartTask,

    /// A domain error raised by a task. Callers recover the concrete type with
    /// [`GraphError::downcast_task_error`].
    #[error(transparent)]
    Task(BoxError),
}

impl GraphError {
    /// Wrap any error produced inside a task.
    pub fn task<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GraphError::Task(Box::new(error))
    }

    /// Returns the task's own error if it is of type `E`, otherwise gives `self` back.
    pub fn downcast_task_error<E>(self) -> std::result::Result<E, GraphError>
    where
        E: std::error::Error + 'static,
    {
        match self {
            GraphError::Task(source) => match source.downcast::<E>() {
                Ok(err) => Ok(*err),
                Err(source) => Err(GraphError::Task(source)),
            },
            other => Err(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
