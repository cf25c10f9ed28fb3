pub mod geocoder;
pub mod nominatim;
pub mod pacer;
pub mod resolver;
pub mod scripted;

pub use geocoder::*;
pub use nominatim::*;
pub use pacer::*;
pub use resolver::*;
pub use scripted::*;
