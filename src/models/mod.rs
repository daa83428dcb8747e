pub mod file;
pub mod quota;

pub use file::*;
pub use quota::*;
