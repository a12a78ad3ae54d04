use crate::{
    beam::BeamPowerError, limits::LimitsError, requirements::RequirementsError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `requirements` module")]
    Requirements(#[from] RequirementsError),
    #[error("Error in the `beam` module")]
    BeamPower(#[from] BeamPowerError),
    #[error("Error in the `limits` module")]
    Limits(#[from] LimitsError),
}
