//! Wire encoding for the overlay tree.
//!
//! The tree travels as one linear, self-delimiting string so a remote
//! receiver can discover its own node-plus-children window by cheap
//! substring scanning, without deserializing the whole tree.
//!
//! Grammar (SP = one ASCII space):
//!
//! ```text
//! node  := ident ':' port SP rank (SP '[' (SP node)* SP ']')?
//! ident := hostname string with no ':' or whitespace
//! ```
//!
//! Internal nodes carry a bracketed, space-separated child list; leaf
//! (backend) nodes carry none. Space is the sole token separator, and the
//! encoder and parser are strictly symmetric about it: the encoder emits
//! exactly single spaces with no trailing whitespace, and the parser assumes
//! no tolerance beyond runs of spaces between tokens.

pub mod encoder;
pub mod parser;

pub use encoder::{EncodedTree, TreeEncoder};
pub use parser::{Children, TreeParser};
