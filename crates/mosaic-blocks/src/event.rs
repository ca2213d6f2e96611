//! Change notifications.
//!
//! Every structural or value mutation fires an [`Event`] through the
//! workspace's [`EventBus`]. Delivery is synchronous: listeners have seen the
//! event before the mutating call returns, unless a batch is open, in which
//! case events are queued and delivered (coalesced) when the outermost batch
//! ends.

use std::fmt;

use mosaic_common::BlockId;

use crate::block::Coordinate;

/// Which property a [`Event::Change`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeElement {
    Field,
    Disabled,
    Collapsed,
    Comment,
}

/// A mutation of the block graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Create {
        block: BlockId,
        kind: &'static str,
    },
    /// `ids` lists every block disposed with `block`, root first.
    Delete {
        block: BlockId,
        ids: Vec<BlockId>,
    },
    Move {
        block: BlockId,
        old_parent: Option<BlockId>,
        old_input: Option<String>,
        old_coordinate: Option<Coordinate>,
        new_parent: Option<BlockId>,
        new_input: Option<String>,
        new_coordinate: Option<Coordinate>,
    },
    Change {
        block: BlockId,
        element: ChangeElement,
        name: Option<String>,
        old_value: String,
        new_value: String,
    },
}

impl Event {
    pub fn block(&self) -> BlockId {
        match self {
            Event::Create { block, .. }
            | Event::Delete { block, .. }
            | Event::Move { block, .. }
            | Event::Change { block, .. } => *block,
        }
    }

    /// Whether replaying this event would change nothing.
    pub fn is_null(&self) -> bool {
        match self {
            Event::Change {
                old_value,
                new_value,
                ..
            } => old_value == new_value,
            Event::Move {
                old_parent,
                old_input,
                old_coordinate,
                new_parent,
                new_input,
                new_coordinate,
                ..
            } => {
                old_parent == new_parent
                    && old_input == new_input
                    && old_coordinate == new_coordinate
            }
            _ => false,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Create { block, kind } => write!(f, "create {} ({})", block, kind),
            Event::Delete { block, ids } => write!(f, "delete {} ({} blocks)", block, ids.len()),
            Event::Move {
                block,
                old_parent,
                new_parent,
                ..
            } => {
                let show = |p: &Option<BlockId>| p.map_or_else(|| "top".to_string(), |b| b.to_string());
                write!(f, "move {} {} -> {}", block, show(old_parent), show(new_parent))
            }
            Event::Change {
                block,
                element,
                name,
                old_value,
                new_value,
            } => {
                write!(f, "change {} {:?}", block, element)?;
                if let Some(name) = name {
                    write!(f, " {}", name)?;
                }
                write!(f, ": {:?} -> {:?}", old_value, new_value)
            }
        }
    }
}

/// Proof that a batch was opened; hand it back to
/// [`EventBus::end_batch`] to close it.
#[must_use = "a batch stays open until its token is passed to end_batch"]
#[derive(Debug)]
pub struct BatchToken {
    depth: u32,
}

type Listener = Box<dyn FnMut(&Event)>;

/// Observer list with an enable switch and nested batching.
pub struct EventBus {
    listeners: Vec<Listener>,
    enabled: bool,
    batch_depth: u32,
    pending: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            listeners: Vec::new(),
            enabled: true,
            batch_depth: 0,
            pending: Vec::new(),
        }
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled buses drop events instead of delivering them.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn fire(&mut self, event: Event) {
        if !self.enabled {
            return;
        }
        if self.batch_depth > 0 {
            self.pending.push(event);
        } else {
            self.deliver(&event);
        }
    }

    pub fn begin_batch(&mut self) -> BatchToken {
        self.batch_depth += 1;
        BatchToken {
            depth: self.batch_depth,
        }
    }

    /// Close a batch. Closing the outermost batch flushes queued events.
    ///
    /// # Panics
    ///
    /// Panics if batches are closed out of order.
    pub fn end_batch(&mut self, token: BatchToken) {
        assert_eq!(
            token.depth, self.batch_depth,
            "batches must be closed innermost first"
        );
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            let queued = coalesce(std::mem::take(&mut self.pending));
            for event in &queued {
                self.deliver(event);
            }
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    fn deliver(&mut self, event: &Event) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("enabled", &self.enabled)
            .field("batch_depth", &self.batch_depth)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Merge consecutive changes to the same property and drop no-op events.
fn coalesce(events: Vec<Event>) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        if let (
            Some(Event::Change {
                block: prev_block,
                element: prev_element,
                name: prev_name,
                new_value: prev_new,
                ..
            }),
            Event::Change {
                block,
                element,
                name,
                new_value,
                ..
            },
        ) = (out.last_mut(), &event)
        {
            if prev_block == block && prev_element == element && prev_name == name {
                *prev_new = new_value.clone();
                continue;
            }
        }
        out.push(event);
    }
    out.retain(|event| !event.is_null());
    out
}
