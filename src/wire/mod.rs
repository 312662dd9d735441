/// Outbound actions in the key/value layout
pub mod action;
/// Packed inbound commands
pub mod command;
/// Command, action and tuple identifiers
pub mod consts;
/// Bounded little-endian reading and writing
pub mod cursor;
/// Key/value dictionary layout
pub mod dict;
/// Scalar types shared by commands and actions
pub mod types;

pub use action::Action;
pub use command::{Command, Header};
pub use consts::{ActionId, CommandId};
