pub mod error;
pub mod submitter;

pub use error::{InclusionTimeout, Stage, TransferError};
pub use submitter::TransferSubmitter;
