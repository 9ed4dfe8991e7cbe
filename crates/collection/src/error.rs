use brainz::BrainzError;
use common::WorkId;

#[derive(Debug)]
pub enum CollectionError {
    /// An entity of this kind and id is already in the store.
    Duplicate { kind: &'static str, id: String },
    Source(BrainzError),
    /// The parent chain of a work leads back to itself.
    WorkCycle(Vec<WorkId>),
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionError::Duplicate { kind, id } => {
                write!(f, "{} {} already in store", kind, id)
            }
            CollectionError::Source(err) => write!(f, "musicbrainz error: {}", err),
            CollectionError::WorkCycle(chain) => {
                let chain: Vec<&str> = chain.iter().map(|id| id.as_str()).collect();
                write!(f, "cyclic parent works: {}", chain.join(" -> "))
            }
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BrainzError> for CollectionError {
    fn from(err: BrainzError) -> Self {
        CollectionError::Source(err)
    }
}
