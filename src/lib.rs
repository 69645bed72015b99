pub mod command;
pub mod error;
pub mod manifest;
pub mod observability;
pub mod plan;
pub mod stager;
pub mod validation;

pub use command::{CommandRunner, CommandStatus, DryRunRunner, Invocation, SystemRunner};
pub use error::BuildError;
pub use plan::{StagePlan, Step, TargetTriple};
pub use stager::Stager;
