pub mod audit;
pub mod completion;
pub mod config;
pub mod model;
pub mod orchestrator;
pub mod paths;
pub mod persistence;
pub mod prompt;
pub mod safety;
pub mod schema;
pub mod util;
pub mod warn;
