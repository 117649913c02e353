//! Resource graph for the scheduled web kiosk export job.
//!
//! This crate owns deterministic synthesis of the stack (execution role,
//! permission policy, scheduled function and timer rule) into a
//! CloudFormation template. It intentionally excludes AWS SDK and
//! provisioning concerns: nothing here talks to the network, and every
//! builder is a pure function of its inputs.

pub mod assertions;
pub mod asset;
pub mod config;
pub mod error;
pub mod naming;
pub mod policy;
pub mod resources;
pub mod runtime_env;
pub mod stack;
pub mod stage;
pub mod template;

pub use config::StackConfig;
pub use error::SynthError;
pub use stack::{synthesize, SCHEDULE_EXPRESSION};
pub use stage::Stage;
pub use template::Template;
