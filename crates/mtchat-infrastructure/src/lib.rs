//! Infrastructure for mtchat: HTTP gateway, session stores, config and tracing.

pub mod config_service;
pub mod gateway;
pub mod paths;
pub mod remote_api;
pub mod storage;
pub mod telemetry;

pub use gateway::{ApiGateway, ApiResponse, RequestOptions};
pub use remote_api::RemoteEntityApi;
