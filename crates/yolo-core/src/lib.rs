pub mod ask;
pub mod authoring;
pub mod composer;
pub mod config;
pub mod conventional;
pub mod error;
pub mod explainer;
pub mod history;
pub mod id;
pub mod io;
pub mod materializer;
pub mod model;
pub mod paths;
pub mod planner;
pub mod prompts;
pub mod relationships;
pub mod scaffold;
pub mod sprint;
pub mod store;
pub mod types;
pub mod vcs;

pub use error::{ErrorKind, Result, YoloError};
