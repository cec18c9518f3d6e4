mod health;
mod response;
mod router;
mod state;

pub use response::{ApiError, ApiResponse, ApiResult, EmptyData, ErrorKind, IntoApiError};
pub use router::system_router;
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateInner};
