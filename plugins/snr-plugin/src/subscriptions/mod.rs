//! Handlers for the notification topics the plugin subscribes to.
//! Notifications have no response channel: failures here are logged by
//! the runtime and never reach the host.

pub mod sendpay_success;
pub mod shutdown;
