pub mod error;
pub mod id;
pub mod traits;
pub mod utils;

pub use error::{Error, Result};
pub use id::{Id, IdSequence};
pub use traits::Entity;
pub use utils::{ensure_directory, format_ron_pretty, parse_ron};
