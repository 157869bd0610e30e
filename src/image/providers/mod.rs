//! Image generation providers.

mod dashscope;

pub use dashscope::{DashScopeClient, DashScopeClientBuilder, DEFAULT_ENDPOINT};
