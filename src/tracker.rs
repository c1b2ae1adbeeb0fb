//! Per-handler call-depth tracking.
//!
//! A [`DepthTracker`] turns the stream of [`CallChain`]s seen by one handler
//! into positions in a tree. Each frame on its stack stands for the most
//! recent entry rendered at that depth; the stack's length minus one is the
//! current depth.
//!
//! For every event the tracker picks one of three moves:
//!
//! * **Descent**: the stack top is a live caller of the logging frame, so the
//!   event nests under the top's latest entry.
//! * **Repeat**: the logging frame is the stack top, so the event is a
//!   sibling of its previous entry (or nests under it when a manual increase
//!   is due).
//! * **Ascent**: anything else. Frames are popped until the logging frame or
//!   one of its callers is on top. If nothing matches, the tree restarts from
//!   a new root and all queued manual adjustments are dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{LogError, Result};
use crate::event::ManualDepth;
use crate::frame::{CallChain, FrameIdentity};

/// How an event attaches to the previously rendered one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// First entry of a new tree.
    Root,
    /// First entry of a new `children` block under the previous entry.
    Child,
    /// Next entry of an already open sequence at this depth.
    Sibling,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Child => "child",
            Self::Sibling => "sibling",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the next event lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub relation: Relation,
    pub depth: usize,
}

impl Transition {
    fn new(relation: Relation, depth: usize) -> Result<Self> {
        match (relation, depth) {
            (Relation::Root, 0) | (Relation::Sibling, _) => Ok(Self { relation, depth }),
            (Relation::Child, d) if d > 0 => Ok(Self { relation, depth }),
            _ => Err(LogError::Internal(format!(
                "tracker produced {relation} at depth {depth}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DepthFrame {
    identity: FrameIdentity,
    /// 1 when pushed by a manual increase, 0 when pushed by the call chain.
    manual_delta: u8,
    /// Number of contiguous manual frames of `identity` ending at this one.
    total_manual_depth: usize,
    /// Whether this frame's latest entry already opened a `children` block.
    has_children: bool,
}

impl DepthFrame {
    fn call(identity: FrameIdentity) -> Self {
        Self {
            identity,
            manual_delta: 0,
            total_manual_depth: 0,
            has_children: false,
        }
    }
}

/// State needed to revert one [`DepthTracker::advance_undoable`].
#[derive(Debug)]
pub struct Undo {
    stack: Vec<DepthFrame>,
    frame: FrameIdentity,
    increase: bool,
    decrease: Option<usize>,
    /// Queues dropped when the tree restarted from a new root.
    discarded: Option<(HashSet<FrameIdentity>, HashMap<FrameIdentity, usize>)>,
}

#[derive(Debug, Clone, Default)]
pub struct DepthTracker {
    stack: Vec<DepthFrame>,
    pending_increase: HashSet<FrameIdentity>,
    pending_decrease: HashMap<FrameIdentity, usize>,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current depth; 0 for an empty stack.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Queue one level of nesting for `identity`'s next event.
    ///
    /// Repeated calls before that event still nest it only one level.
    pub fn queue_increase(&mut self, identity: FrameIdentity) {
        self.pending_increase.insert(identity);
    }

    /// Queue `levels` manual levels to be dropped before `identity`'s next
    /// event. Zero is a no-op.
    pub fn queue_decrease(&mut self, identity: FrameIdentity, levels: usize) {
        if levels == 0 {
            return;
        }
        *self.pending_decrease.entry(identity).or_insert(0) += levels;
    }

    /// Whether `identity` has a queued manual adjustment.
    pub fn has_pending(&self, identity: &FrameIdentity) -> bool {
        self.pending_increase.contains(identity) || self.pending_decrease.contains_key(identity)
    }

    /// Forget the current tree but keep queued manual adjustments.
    pub fn restart(&mut self) {
        self.stack.clear();
    }

    /// Place the next event of `chain.frame` in the tree.
    ///
    /// `explicit` wins over whatever was queued for the frame; queued
    /// adjustments are consumed either way.
    pub fn advance(&mut self, chain: &CallChain, explicit: ManualDepth) -> Result<Transition> {
        self.advance_undoable(chain, explicit)
            .map(|(transition, _)| transition)
    }

    /// [`advance`](Self::advance), also returning what [`undo`](Self::undo)
    /// needs to put the tracker back as it was.
    pub fn advance_undoable(
        &mut self,
        chain: &CallChain,
        explicit: ManualDepth,
    ) -> Result<(Transition, Undo)> {
        let frame = chain.frame;
        let mut undo = Undo {
            stack: self.stack.clone(),
            frame,
            increase: self.pending_increase.remove(&frame),
            decrease: self.pending_decrease.remove(&frame),
            discarded: None,
        };
        let manual = net_manual(undo.increase, undo.decrease.unwrap_or(0), explicit);
        let transition = match self.place(chain, manual) {
            Ok(transition) => transition,
            Err(e) => {
                self.undo(undo);
                return Err(e);
            }
        };
        if transition.relation == Relation::Root && !undo.stack.is_empty() {
            undo.discarded = Some((
                std::mem::take(&mut self.pending_increase),
                std::mem::take(&mut self.pending_decrease),
            ));
        }
        Ok((transition, undo))
    }

    /// Revert the `advance_undoable` call that returned `undo`. Only valid
    /// as long as nothing else touched the tracker since.
    pub fn undo(&mut self, undo: Undo) {
        self.stack = undo.stack;
        if let Some((increase, decrease)) = undo.discarded {
            self.pending_increase = increase;
            self.pending_decrease = decrease;
        }
        if undo.increase {
            self.pending_increase.insert(undo.frame);
        }
        if let Some(levels) = undo.decrease {
            self.pending_decrease.insert(undo.frame, levels);
        }
    }

    fn place(&mut self, chain: &CallChain, manual: ManualDepth) -> Result<Transition> {
        let frame = chain.frame;
        let Some(top) = self.stack.last() else {
            return self.start_root(frame);
        };

        // Descent. A manual increase is absorbed by the nesting itself.
        if chain.has_ancestor(&top.identity) {
            return self.push_child(frame, 0);
        }

        // Repeat.
        if top.identity == frame {
            return self.apply_manual(frame, manual);
        }

        // Ascent.
        while let Some(top) = self.stack.last() {
            if top.identity == frame {
                return self.apply_manual(frame, manual);
            }
            if chain.has_ancestor(&top.identity) {
                return self.push_child(frame, 0);
            }
            self.stack.pop();
        }
        self.start_root(frame)
    }

    /// One-line dump of the tracker, used by the debug trailer.
    pub fn describe(&self, transition: &Transition) -> String {
        let frames = self
            .stack
            .iter()
            .map(|f| {
                if f.manual_delta > 0 {
                    format!("{}(+{})", f.identity, f.total_manual_depth)
                } else {
                    f.identity.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "depth={} relation={} stack=[{}]",
            transition.depth, transition.relation, frames
        )
    }

    fn start_root(&mut self, frame: FrameIdentity) -> Result<Transition> {
        self.stack.clear();
        self.stack.push(DepthFrame::call(frame));
        Transition::new(Relation::Root, 0)
    }

    /// Push `frame` one level below the current top's latest entry.
    fn push_child(&mut self, frame: FrameIdentity, manual_delta: u8) -> Result<Transition> {
        let Some(parent) = self.stack.last_mut() else {
            return Err(LogError::Internal("push onto an empty depth stack".into()));
        };
        let relation = if parent.has_children {
            Relation::Sibling
        } else {
            Relation::Child
        };
        parent.has_children = true;
        let total_manual_depth = if manual_delta > 0 && parent.identity == frame {
            parent.total_manual_depth + 1
        } else {
            usize::from(manual_delta)
        };
        self.stack.push(DepthFrame {
            identity: frame,
            manual_delta,
            total_manual_depth,
            has_children: false,
        });
        Transition::new(relation, self.depth())
    }

    /// Handle an event whose frame is the current top.
    fn apply_manual(&mut self, frame: FrameIdentity, manual: ManualDepth) -> Result<Transition> {
        match manual {
            ManualDepth::Increase => return self.push_child(frame, 1),
            ManualDepth::Decrease(levels) if levels > 0 => {
                let removable = self
                    .stack
                    .last()
                    .filter(|top| top.identity == frame)
                    .map_or(0, |top| top.total_manual_depth);
                if removable >= levels {
                    let keep = self.stack.len() - levels;
                    self.stack.truncate(keep);
                }
            }
            _ => {}
        }
        if let Some(top) = self.stack.last_mut() {
            top.has_children = false;
        }
        Transition::new(Relation::Sibling, self.depth())
    }
}

/// Combine a frame's queued adjustments, unless `explicit` overrides them.
fn net_manual(increase: bool, decrease: usize, explicit: ManualDepth) -> ManualDepth {
    if !explicit.is_no_change() {
        return explicit;
    }
    match (increase, decrease) {
        (true, 0) => ManualDepth::Increase,
        (true, 1) | (false, 0) => ManualDepth::NoChange,
        (true, n) => ManualDepth::Decrease(n - 1),
        (false, n) => ManualDepth::Decrease(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: FrameIdentity = FrameIdentity::new("app.rs", None, "a");
    const B: FrameIdentity = FrameIdentity::new("app.rs", None, "b");
    const C: FrameIdentity = FrameIdentity::new("app.rs", Some("Job"), "c");
    const D: FrameIdentity = FrameIdentity::new("app.rs", None, "d");

    fn chain(frame: FrameIdentity, ancestors: &[FrameIdentity]) -> CallChain {
        CallChain::new(frame, ancestors.to_vec())
    }

    fn step(tracker: &mut DepthTracker, c: &CallChain) -> (Relation, usize) {
        let t = tracker.advance(c, ManualDepth::NoChange).unwrap();
        (t.relation, t.depth)
    }

    #[test]
    fn test_first_event_is_root() {
        let mut tracker = DepthTracker::new();
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Root, 0));
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_repeat_is_sibling() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        for _ in 0..3 {
            assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 0));
        }
    }

    #[test]
    fn test_descent_then_return() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Child, 1));
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Sibling, 1));
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 0));
        // A's new entry has no children yet.
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Child, 1));
    }

    #[test]
    fn test_second_callee_joins_open_children_block() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        step(&mut tracker, &chain(B, &[A]));
        step(&mut tracker, &chain(C, &[B, A]));
        // D called directly by A after B returned.
        assert_eq!(step(&mut tracker, &chain(D, &[A])), (Relation::Sibling, 1));
    }

    #[test]
    fn test_unrelated_frame_restarts_tree() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        step(&mut tracker, &chain(B, &[A]));
        tracker.queue_increase(A);
        assert_eq!(step(&mut tracker, &chain(C, &[])), (Relation::Root, 0));
        assert!(!tracker.has_pending(&A));
    }

    #[test]
    fn test_increase_affects_only_next_call_of_same_frame() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.queue_increase(A);
        tracker.queue_increase(A);
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Child, 1));
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 1));
    }

    #[test]
    fn test_increase_not_consumed_by_other_frame() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.queue_increase(A);
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Child, 1));
        assert!(tracker.has_pending(&A));
        // Back in A: the queued increase nests under A's entry, next to B.
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 1));
    }

    #[test]
    fn test_decrease_pops_manual_levels() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.advance(&chain(A, &[]), ManualDepth::Increase).unwrap();
        tracker.advance(&chain(A, &[]), ManualDepth::Increase).unwrap();
        assert_eq!(tracker.depth(), 2);
        tracker.queue_decrease(A, 2);
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 0));
    }

    #[test]
    fn test_decrease_needs_enough_manual_levels() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.advance(&chain(A, &[]), ManualDepth::Increase).unwrap();
        let t = tracker.advance(&chain(A, &[]), ManualDepth::Decrease(2)).unwrap();
        assert_eq!((t.relation, t.depth), (Relation::Sibling, 1));
        let t = tracker.advance(&chain(A, &[]), ManualDepth::Decrease(5)).unwrap();
        assert_eq!(t.depth, 1);
    }

    #[test]
    fn test_decrease_never_pops_call_frames() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        step(&mut tracker, &chain(B, &[A]));
        tracker.queue_decrease(B, 1);
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Sibling, 1));
        tracker.queue_decrease(A, 0);
        assert!(!tracker.has_pending(&A));
    }

    #[test]
    fn test_explicit_manual_overrides_queue() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.queue_increase(A);
        let t = tracker.advance(&chain(A, &[]), ManualDepth::Decrease(1)).unwrap();
        assert_eq!(t.depth, 0);
        assert!(!tracker.has_pending(&A));
    }

    #[test]
    fn test_restart_keeps_pending() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.queue_increase(B);
        tracker.restart();
        assert!(tracker.is_empty());
        assert!(tracker.has_pending(&B));
        assert_eq!(step(&mut tracker, &chain(B, &[])), (Relation::Root, 0));
    }

    #[test]
    fn test_undo_reverts_descent() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        let (t, undo) = tracker
            .advance_undoable(&chain(B, &[A]), ManualDepth::NoChange)
            .unwrap();
        assert_eq!((t.relation, t.depth), (Relation::Child, 1));
        tracker.undo(undo);
        assert_eq!(tracker.depth(), 0);
        assert_eq!(step(&mut tracker, &chain(B, &[A])), (Relation::Child, 1));
    }

    #[test]
    fn test_undo_after_restart_restores_queues() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        tracker.queue_increase(B);
        tracker.queue_decrease(D, 1);
        let (t, undo) = tracker
            .advance_undoable(&chain(D, &[]), ManualDepth::NoChange)
            .unwrap();
        assert_eq!((t.relation, t.depth), (Relation::Root, 0));
        assert!(!tracker.has_pending(&B));
        assert!(!tracker.has_pending(&D));

        tracker.undo(undo);
        assert!(tracker.has_pending(&B));
        assert!(tracker.has_pending(&D));
        assert_eq!(step(&mut tracker, &chain(A, &[])), (Relation::Sibling, 0));
    }

    #[test]
    fn test_describe_lists_stack() {
        let mut tracker = DepthTracker::new();
        step(&mut tracker, &chain(A, &[]));
        let t = tracker.advance(&chain(C, &[A]), ManualDepth::NoChange).unwrap();
        assert_eq!(
            tracker.describe(&t),
            "depth=1 relation=child stack=[app.rs.a, app.rs.Job.c]"
        );
    }
}
