//! Node records and link patches.

use arbor_common::{Bracket, Link};
use std::sync::Arc;

/// What a node table stores for one tree node.
///
/// The payload sits behind `Arc` so records clone cheaply whatever `P` is.
#[derive(Debug)]
pub struct NodeRecord<P> {
    /// Depth of the node (root = base level, children = parent + 1).
    pub level: i64,
    /// Where the node's open bracket lives.
    pub open_link: Link,
    /// Where the node's close bracket lives.
    pub close_link: Link,
    payload: Arc<P>,
}

impl<P> Clone for NodeRecord<P> {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            open_link: self.open_link,
            close_link: self.close_link,
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<P> NodeRecord<P> {
    pub fn new(level: i64, open_link: Link, close_link: Link, payload: P) -> Self {
        Self {
            level,
            open_link,
            close_link,
            payload: Arc::new(payload),
        }
    }

    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Returns the link of the given bracket.
    #[inline]
    pub fn link(&self, bracket: Bracket) -> Link {
        match bracket {
            Bracket::Open => self.open_link,
            Bracket::Close => self.close_link,
        }
    }

    /// Returns a copy with the patch's links merged in.
    pub fn patched(&self, patch: &LinkPatch) -> Self {
        let mut record = self.clone();
        if let Some(open) = patch.open {
            record.open_link = open;
        }
        if let Some(close) = patch.close {
            record.close_link = close;
        }
        record
    }
}

/// Partial link update: only the supplied fields are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub open: Option<Link>,
    pub close: Option<Link>,
}

impl LinkPatch {
    pub fn open(link: Link) -> Self {
        Self {
            open: Some(link),
            close: None,
        }
    }

    pub fn close(link: Link) -> Self {
        Self {
            open: None,
            close: Some(link),
        }
    }

    pub fn both(open: Link, close: Link) -> Self {
        Self {
            open: Some(open),
            close: Some(close),
        }
    }

    /// Patch for whichever bracket an entry is.
    pub fn for_bracket(bracket: Bracket, link: Link) -> Self {
        match bracket {
            Bracket::Open => Self::open(link),
            Bracket::Close => Self::close(link),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.close.is_none()
    }
}
