pub mod columns;
pub mod csv_store;
pub mod memory;
pub mod traits;

pub use columns::*;
pub use csv_store::*;
pub use memory::*;
pub use traits::*;
