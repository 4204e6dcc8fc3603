//! Parser half of the wire codec.
//!
//! `TreeParser` navigates a received encoding stepwise — root identity, rank,
//! then child by child — without ever building a graph. Every scan step is
//! bounds-checked: the format carries no length or checksum framing, so
//! truncated buffers, unbalanced brackets, and missing tokens must surface as
//! [`Error::MalformedEncoding`] instead of a panic or a silently wrong
//! subtree.

use crate::error::{Error, Result};
use crate::node::{NodeId, Rank};
use std::cell::Cell;

/// Read-only scanner over one tree encoding.
///
/// A parser wraps a fixed buffer and is immutable except for its cursor
/// (used only during child-by-child navigation) and two memoized scan
/// counts. It is a stateful iterator: one instance per caller. Independent
/// parse operations should use independent instances, which is cheap —
/// parsers borrow the buffer, and [`next_child`](TreeParser::next_child)
/// hands out sub-parsers over subslices without copying.
///
/// # Example
///
/// ```rust
/// use corelib::TreeParser;
///
/// let mut parser = TreeParser::new("A:1 0 [ B:2 1 C:3 2 ]");
/// assert_eq!(parser.root_hostname().unwrap(), "A");
/// assert_eq!(parser.root_port().unwrap(), 1);
/// let first = parser.next_child().unwrap().unwrap();
/// assert_eq!(first.root_hostname().unwrap(), "B");
/// ```
#[derive(Clone, Debug)]
pub struct TreeParser<'a> {
    buf: &'a str,
    /// Scan position for child navigation. `None` until seeked.
    cursor: Option<usize>,
    node_count: Cell<Option<usize>>,
    leaf_count: Cell<Option<usize>>,
}

impl<'a> TreeParser<'a> {
    /// Wrap a received encoding. No validation happens up front; each
    /// navigation call checks exactly the bytes it scans.
    pub fn new(buf: &'a str) -> Self {
        Self {
            buf,
            cursor: None,
            node_count: Cell::new(None),
            leaf_count: Cell::new(None),
        }
    }

    /// The underlying encoded text.
    pub fn as_str(&self) -> &'a str {
        self.buf
    }

    /// Hostname of this parser's root node.
    pub fn root_hostname(&self) -> Result<&'a str> {
        Ok(self.root_header()?.0)
    }

    /// Port of this parser's root node.
    pub fn root_port(&self) -> Result<u16> {
        Ok(self.root_header()?.1)
    }

    /// Identity of this parser's root node.
    pub fn root_id(&self) -> Result<NodeId> {
        let (host, port, _, _) = self.root_header()?;
        Ok(NodeId::new(host, port))
    }

    /// Rank token following the root's identity.
    pub fn root_rank(&self) -> Result<Rank> {
        Ok(self.root_header()?.2)
    }

    /// True iff the next non-space character after the rank token is `[`.
    pub fn has_children(&self) -> Result<bool> {
        let (_, _, _, after_rank) = self.root_header()?;
        let b = self.buf.as_bytes();
        let i = self.skip_spaces(after_rank);
        if i >= b.len() {
            return Ok(false);
        }
        if b[i] == b'[' {
            return Ok(true);
        }
        Err(Error::malformed(i, "unexpected content after rank token"))
    }

    /// Position the cursor at the start of the first child's substring.
    ///
    /// Fails with `MalformedEncoding` when this node carries no child list;
    /// use [`has_children`](TreeParser::has_children) to probe first.
    pub fn seek_first_child(&mut self) -> Result<()> {
        let (_, _, _, after_rank) = self.root_header()?;
        let b = self.buf.as_bytes();
        let i = self.skip_spaces(after_rank);
        if i < b.len() && b[i] == b'[' {
            self.cursor = Some(i + 1);
            Ok(())
        } else {
            Err(Error::malformed(i.min(b.len()), "node has no child list"))
        }
    }

    /// Scan the next bracket-balanced child substring and return a parser
    /// wrapping exactly that substring. Repeated calls enumerate siblings
    /// left to right; `Ok(None)` once the current nesting level is
    /// exhausted. The first call seeks implicitly if the cursor was never
    /// positioned (immediately `Ok(None)` for a leaf).
    pub fn next_child(&mut self) -> Result<Option<TreeParser<'a>>> {
        if self.cursor.is_none() {
            if !self.has_children()? {
                return Ok(None);
            }
            self.seek_first_child()?;
        }
        let b = self.buf.as_bytes();
        let i = self.skip_spaces(self.cursor.unwrap_or(0));
        if i >= b.len() {
            return Err(Error::malformed(i, "unterminated child list"));
        }
        if b[i] == b']' {
            // Stay on the bracket so further calls keep reporting None.
            self.cursor = Some(i);
            return Ok(None);
        }

        let start = i;
        let (is, ie) = self
            .scan_token(i)
            .ok_or_else(|| Error::malformed(i, "unterminated child list"))?;
        self.parse_ident(&self.buf[is..ie], is)?;
        let (rs, re) = self
            .scan_token(ie)
            .ok_or_else(|| Error::malformed(ie, "missing rank token"))?;
        self.parse_rank(&self.buf[rs..re], rs)?;

        let mut end = re;
        let j = self.skip_spaces(re);
        if j < b.len() && b[j] == b'[' {
            // Child is itself a subtree: scan to its matching bracket.
            let mut depth = 1usize;
            let mut k = j + 1;
            while k < b.len() && depth > 0 {
                match b[k] {
                    b'[' => depth += 1,
                    b']' => depth -= 1,
                    _ => {}
                }
                k += 1;
            }
            if depth != 0 {
                return Err(Error::malformed(b.len(), "unbalanced brackets in child list"));
            }
            end = k;
        }
        self.cursor = Some(end);
        Ok(Some(TreeParser::new(&self.buf[start..end])))
    }

    /// Iterator over this node's children, with a cursor independent of
    /// this parser's own.
    pub fn children(&self) -> Children<'a> {
        Children {
            parser: TreeParser::new(self.buf),
            done: false,
        }
    }

    /// Total number of nodes in the encoding. Memoized; the underlying scan
    /// verifies bracket balance and token shape, so this doubles as a
    /// structural check of the whole buffer.
    pub fn node_count(&self) -> Result<usize> {
        if let Some(n) = self.node_count.get() {
            return Ok(n);
        }
        let (nodes, leaves) = self.scan_counts()?;
        self.node_count.set(Some(nodes));
        self.leaf_count.set(Some(leaves));
        Ok(nodes)
    }

    /// Number of leaf (backend) nodes: nodes whose rank token is not
    /// followed by `[`. Memoized, same scan as `node_count`.
    pub fn leaf_count(&self) -> Result<usize> {
        if let Some(n) = self.leaf_count.get() {
            return Ok(n);
        }
        let (nodes, leaves) = self.scan_counts()?;
        self.node_count.set(Some(nodes));
        self.leaf_count.set(Some(leaves));
        Ok(leaves)
    }

    // ------------------------------------------------------------------
    // Scan primitives. All offsets are byte offsets into `buf`; the bytes
    // we branch on (space, brackets, ':', digits) are ASCII, so byte
    // scanning never splits a UTF-8 hostname.
    // ------------------------------------------------------------------

    fn skip_spaces(&self, mut i: usize) -> usize {
        let b = self.buf.as_bytes();
        while i < b.len() && b[i] == b' ' {
            i += 1;
        }
        i
    }

    /// Next maximal non-space run at or after `from`, or `None` at end of
    /// buffer.
    fn scan_token(&self, from: usize) -> Option<(usize, usize)> {
        let b = self.buf.as_bytes();
        let start = self.skip_spaces(from);
        if start >= b.len() {
            return None;
        }
        let mut end = start;
        while end < b.len() && b[end] != b' ' {
            end += 1;
        }
        Some((start, end))
    }

    /// Parse `hostname:port` out of one token.
    ///
    /// Brackets are rejected inside the hostname: the child-window scan in
    /// [`next_child`](TreeParser::next_child) counts every `[`/`]` byte as
    /// structure, so an ident carrying one would make that scan and
    /// [`scan_counts`](TreeParser::scan_counts) slice different trees from
    /// the same buffer. Both paths must accept exactly the same language.
    fn parse_ident(&self, tok: &'a str, offset: usize) -> Result<(&'a str, u16)> {
        let (host, port_str) = tok
            .split_once(':')
            .ok_or_else(|| Error::malformed(offset, "expected host:port ident"))?;
        if host.is_empty() {
            return Err(Error::malformed(offset, "empty hostname in ident"));
        }
        if host.contains('[') || host.contains(']') {
            return Err(Error::malformed(offset, "bracket character in hostname"));
        }
        if port_str.is_empty() || !port_str.bytes().all(|c| c.is_ascii_digit()) {
            return Err(Error::malformed(offset, "invalid port in ident"));
        }
        let port: u32 = port_str
            .parse()
            .map_err(|_| Error::malformed(offset, "invalid port in ident"))?;
        if port == 0 || port > u16::MAX as u32 {
            return Err(Error::malformed(offset, "port out of range"));
        }
        Ok((host, port as u16))
    }

    /// Parse the decimal rank out of one token.
    fn parse_rank(&self, tok: &str, offset: usize) -> Result<Rank> {
        if tok.is_empty() || !tok.bytes().all(|c| c.is_ascii_digit()) {
            return Err(Error::malformed(offset, "missing or invalid rank token"));
        }
        let rank: u32 = tok
            .parse()
            .map_err(|_| Error::malformed(offset, "rank out of range"))?;
        Ok(Rank(rank))
    }

    /// Root `ident rank` header: `(hostname, port, rank, offset_after_rank)`.
    fn root_header(&self) -> Result<(&'a str, u16, Rank, usize)> {
        let (is, ie) = self
            .scan_token(0)
            .ok_or_else(|| Error::malformed(0, "empty encoding"))?;
        let (host, port) = self.parse_ident(&self.buf[is..ie], is)?;
        let (rs, re) = self
            .scan_token(ie)
            .ok_or_else(|| Error::malformed(ie, "missing rank token"))?;
        let rank = self.parse_rank(&self.buf[rs..re], rs)?;
        Ok((host, port, rank, re))
    }

    /// One pass over the whole buffer: counts nodes and leaves while
    /// checking token shape and bracket balance.
    fn scan_counts(&self) -> Result<(usize, usize)> {
        let b = self.buf.as_bytes();
        let mut nodes = 0usize;
        let mut leaves = 0usize;
        let mut depth = 0usize;
        let mut i = 0usize;
        loop {
            i = self.skip_spaces(i);
            if i >= b.len() {
                break;
            }
            if b[i] == b']' {
                if depth == 0 {
                    return Err(Error::malformed(i, "unmatched ']'"));
                }
                depth -= 1;
                i += 1;
                continue;
            }
            if depth == 0 && nodes > 0 {
                return Err(Error::malformed(i, "content after root node"));
            }
            let (is, ie) = match self.scan_token(i) {
                Some(t) => t,
                None => break,
            };
            self.parse_ident(&self.buf[is..ie], is)?;
            let (rs, re) = self
                .scan_token(ie)
                .ok_or_else(|| Error::malformed(ie, "missing rank token"))?;
            self.parse_rank(&self.buf[rs..re], rs)?;
            nodes += 1;
            i = re;
            let j = self.skip_spaces(i);
            if j < b.len() && b[j] == b'[' {
                depth += 1;
                i = j + 1;
            } else {
                leaves += 1;
            }
        }
        if depth != 0 {
            return Err(Error::malformed(b.len(), "unclosed '['"));
        }
        if nodes == 0 {
            return Err(Error::malformed(0, "empty encoding"));
        }
        Ok((nodes, leaves))
    }
}

/// Iterator adapter over [`TreeParser::next_child`].
///
/// Fused after the first error: a malformed child list yields one `Err` and
/// then ends.
#[derive(Debug)]
pub struct Children<'a> {
    parser: TreeParser<'a>,
    done: bool,
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<TreeParser<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_child() {
            Ok(Some(child)) => Some(Ok(child)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
