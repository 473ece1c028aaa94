//! Structure recovery from raw PHP text without a parser.
//!
//! [`lexer`] turns a file into aligned text views; [`declarations`] walks the
//! `code` view and yields declaration boundaries.

pub mod declarations;
pub mod lexer;

pub use declarations::{
    declarations, declarations_in, matching_close, Declaration, DeclarationKind, DeclarationScanner,
};
pub use lexer::{lex, lex_code, LexedSource, QuoteStyle, StringLiteral, Unterminated};
