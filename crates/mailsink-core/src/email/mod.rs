/// Email processing modules
pub mod parser;

pub use parser::parse_message;
