pub mod beam;
mod error;
pub mod limits;
#[cfg(feature = "plot")]
pub mod plot;
pub mod requirements;

pub use beam::{BeamPower, BeamPowerLoader};
pub use error::Error;
pub use limits::{LimitCalculator, LimitTable, Limits};
pub use requirements::{Requirements, RequirementsLoader, StateRequirement};
