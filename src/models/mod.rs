pub mod job;
pub mod recognition;
pub mod telegram;

pub use job::*;
pub use recognition::*;
