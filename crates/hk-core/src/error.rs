use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cannot parse time unit \"{unit}\" for {location}")]
    BadUnitReference { unit: String, location: String },

    #[error("Cannot parse timestamp \"{value}\" for {location}")]
    BadTimestamp { value: String, location: String },

    #[error("Cannot parse offset value \"{value}\" for {location}")]
    BadOffsetValue { value: String, location: String },
}
