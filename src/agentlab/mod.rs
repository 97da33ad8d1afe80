// src/agentlab/mod.rs
pub mod agent;
pub mod auth;
pub mod chat;
pub mod client_wrapper;
pub mod clients;
pub mod code_blocks;
pub mod coding_session;
pub mod config;
pub mod orchestration;
pub mod remote_executor;
pub mod sessions;
pub mod tool_protocol;
pub mod tool_protocols;
pub mod tools;
