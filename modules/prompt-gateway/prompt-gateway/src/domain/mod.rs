pub mod continuation;
pub mod error;
pub mod metering;
pub mod registry;
pub mod service;
pub mod template;
