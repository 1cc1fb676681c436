pub mod config;
pub mod gitops;
pub mod messaging;
pub mod notify;
pub mod orchestration;
pub mod provider;
pub mod shared;
pub mod store;
pub mod waitq;
pub mod workflow;
