//! Arena-backed HTML DOM used by the inliner: html5ever parsing, tree editing,
//! selector queries and HTML serialization.

pub mod dom;
pub mod parser;

pub use dom::{DOM, DOMNode, NodeKind};
pub use indextree::NodeId;
pub use parser::{parse_document, parse_fragment};
