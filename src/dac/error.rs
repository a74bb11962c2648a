// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DacError {
    #[error("{request} request failed for {address}")]
    RequestFailed { request: &'static str, address: Address },
    #[error("{0} is not supported by this target")]
    NotSupported(&'static str),
    #[error("Runtime data structures are not valid: {0}")]
    InvalidState(String),
}

impl DacError {
    pub fn failed(request: &'static str, address: Address) -> Self {
        DacError::RequestFailed { request, address }
    }
}
