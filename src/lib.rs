pub mod alias;
pub mod error;
pub mod executor;
pub mod fuzzy;
pub mod interpreter;
pub mod keywords;
pub mod logging;
pub mod paths;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod tokenizer;

pub use error::CommandError;
pub use interpreter::{ChainSender, Diagnostic, Interpreter};
pub use registry::{ArgKind, Argument, CommandSpec};
pub use settings::InterpreterSettings;
