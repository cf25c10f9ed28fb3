pub mod controller;
pub mod memory;
pub mod sysinfo_table;
pub mod table;

pub use controller::*;
pub use memory::*;
pub use sysinfo_table::*;
pub use table::*;
