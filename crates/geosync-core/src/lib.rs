pub mod changes;
pub mod diff;
pub mod engine;
pub mod error;
pub mod ids;
pub mod model;
pub mod policy;
pub mod snapshot;
pub mod stats;
pub mod types;

pub use changes::*;
pub use diff::*;
pub use engine::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use policy::*;
pub use snapshot::*;
pub use stats::*;
pub use types::*;
