use hk_bc::BcError;
use hk_core::CoreError;
use thiserror::Error;

pub type ForcingResult<T> = Result<T, ForcingError>;

#[derive(Error, Debug)]
pub enum ForcingError {
    #[error(transparent)]
    Time(#[from] CoreError),

    #[error(transparent)]
    File(#[from] BcError),
}
