pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::*;
pub use memory::*;
pub use records::*;
pub use traits::*;
