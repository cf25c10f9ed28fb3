pub mod manifest;
pub mod notice;
pub mod report;
pub mod store;

pub use manifest::*;
pub use notice::*;
pub use report::*;
pub use store::*;
