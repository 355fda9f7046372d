pub mod callback;
pub mod card;
pub mod console;
pub mod error;
pub mod input_flow;
pub mod list_rules;
pub mod menu;

pub use callback::{Callback, MenuId};
pub use card::{handle_card_callback, CardResult};
pub use console::{handle_callback, ConsoleResult};
pub use error::AdminError;
