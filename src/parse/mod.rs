pub mod calls;
pub mod lexer;
pub mod segment;
pub mod split;

pub use calls::find_call_parens;
pub use segment::{indentation_unit, segment};
pub use split::split_arguments;
