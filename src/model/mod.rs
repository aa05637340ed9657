pub mod brain_dump;
pub mod config;
pub mod focus;
pub mod habit;
pub mod task;
pub mod workspace;

pub use brain_dump::*;
pub use config::*;
pub use focus::*;
pub use habit::*;
pub use task::*;
pub use workspace::*;
