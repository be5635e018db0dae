pub mod error;
pub mod similarity;
pub mod records;
pub mod table;
pub mod prompt;
pub mod client;
pub mod extract;
pub mod pipeline;
pub mod evaluate;

pub use error::{ReviewError, SENTINEL};
