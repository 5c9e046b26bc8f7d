mod cursor;
mod parser;

pub use bbflat_types::{Segment, Tag};
pub use parser::Parser;

const OPEN: char = '[';
const CLOSE: char = ']';
const SLASH: char = '/';
const EQUAL: char = '=';
