pub mod outcome;
pub mod operation;
pub mod profile;

pub use outcome::Outcome;
pub use operation::{OperationDescriptor, OperationKind};
pub use profile::{OptimizationProfile, ProfileName};
