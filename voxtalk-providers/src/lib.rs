pub mod assistant;
pub mod parse;
pub mod request;
pub mod runtime;
