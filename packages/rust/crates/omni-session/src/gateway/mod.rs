//! HTTP gateway: request/reply invoke plus long-poll pull.

mod http;

pub use http::{
    ErrorBody, GatewayHealthResponse, GatewayState, InvokeResponse, PullResponse, router,
    run_http,
};
