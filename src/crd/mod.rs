//! Custom Resource Definitions for the initializer controller

mod initializer_controller;
mod types;

pub use initializer_controller::{InitializerController, InitializerControllerSpec};
pub use types::{
    parse_duration, GroupVersionResources, Hook, InitializerControllerHooks, ServiceReference,
    WebhookSpec, DEFAULT_HOOK_TIMEOUT,
};
