//! One module per RPC method the plugin exposes. Every handler receives
//! the request parameters and a read-only view of the runtime state, and
//! wraps its payload under a `result` key the way the host tooling
//! expects.

pub mod balance;
pub mod history;
pub mod listconfigs;
pub mod place_test_order;
pub mod ticker;
pub mod version;
