mod command_registry;

pub use command_registry::{CommandError, DEFAULT, setup};
