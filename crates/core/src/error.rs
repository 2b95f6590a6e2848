#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Workflow(#[from] workflow::WorkflowError),

    #[error("invalid workflow definition: {0}")]
    Definition(#[from] workflow::DefinitionError),

    #[error("access configuration error: {0}")]
    Access(#[from] access::AccessError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record {0} already exists")]
    AlreadyExists(String),

    #[error("record {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { id: String, expected: u64, found: u64 },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to lock record: {0}")]
    RecordLock(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("record store lock poisoned")]
    LockPoisoned,
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
