use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn queue_closed() -> Error {
        Error(ErrorKind::QueueClosed.into())
    }

    pub fn task_abandoned() -> Error {
        Error(ErrorKind::TaskAbandoned.into())
    }

    pub fn work_item_failure(worker: usize, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::WorkItemFailure {
                worker,
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn chunk_transform(index: usize, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ChunkTransform {
                index,
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn pipeline_failed(index: usize, source: Error) -> Error {
        Error(ErrorKind::PipelineFailed { index, source }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn compression<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Compression {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Returns the index of the failing chunk for `PipelineFailed` and
    /// `ChunkTransform` errors.
    pub fn chunk_index(&self) -> Option<usize> {
        match self.kind() {
            ErrorKind::PipelineFailed { index, .. } | ErrorKind::ChunkTransform { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    pub fn is_queue_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::QueueClosed)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("task queue is shutting down")]
    QueueClosed,

    #[error("task was dropped before producing a result")]
    TaskAbandoned,

    #[error("work item failed on worker {worker}: {message}")]
    WorkItemFailure { worker: usize, message: String },

    #[error("chunk {index} transform failed: {message}")]
    ChunkTransform { index: usize, message: String },

    #[error("pipeline failed at chunk {index}: {source}")]
    PipelineFailed {
        index: usize,
        #[source]
        source: Error,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("compression error: {context}")]
    Compression {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
