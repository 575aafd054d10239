pub mod backend;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod resolver;
pub mod scenario;
pub mod session;
pub mod util;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use fixtures::*;
pub use resolver::*;
pub use session::*;
pub use util::*;
