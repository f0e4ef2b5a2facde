pub mod background;
pub mod file;

pub use background::BackgroundTask;
pub use file::*;
