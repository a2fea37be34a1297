//! tire-search - 轮胎搜索会话引擎
//!
//! 管理一次轮胎搜索会话的客户端状态：防抖联想、分页结果、追问对话，
//! 以及搜索历史、收藏和最近过滤条件的本地持久化。

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{AppError, Result};
pub use services::{SearchSession, SearchSessionState, SessionOptions, create_search_session};
