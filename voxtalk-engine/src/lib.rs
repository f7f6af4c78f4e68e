pub mod backend;
pub mod capture;
pub mod engine;
pub mod traits;
pub mod turn;
