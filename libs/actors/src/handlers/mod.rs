//! Built-in handlers
//!
//! - [`KeyValueHandler`]: the native `Info`/`Set`/`Get`/`List` action set
//! - [`FunctionHandler`]: a user closure owning the full action space

pub mod function;
pub mod key_value;

pub use function::FunctionHandler;
pub use key_value::{KeyValueHandler, NATIVE_ACTIONS};
