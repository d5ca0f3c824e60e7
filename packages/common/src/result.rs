use crate::error::{CommonError, GatewayError};

/// Common Result type alias
pub type CommonResult<T> = Result<T, CommonError>;

/// Result of a call against the remote store
pub type GatewayResult<T> = Result<T, GatewayError>;
