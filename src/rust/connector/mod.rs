mod cache;
mod connector;
mod source;

pub use cache::ModelCache;
pub use connector::{Classification, ConnectorConfig, InferenceConnector, InferencePath};
pub use source::{HubConfig, HubModelSource, ModelSource};
