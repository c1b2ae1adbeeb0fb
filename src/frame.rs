//! Caller identities and the per-thread call chain.
//!
//! Rust offers no reflection over the live call stack, so a function that
//! wants its log events nested beneath its caller's announces itself with
//! [`enter_frame!`](crate::enter_frame). The returned guard pushes a
//! [`FrameIdentity`] onto the calling thread's chain and pops it when the
//! function's scope ends. Every log call snapshots that chain as a
//! [`CallChain`]: the innermost identity is the frame that is speaking, the
//! rest are its live callers.
//!
//! Reading the chain never synchronizes with other threads; each thread only
//! ever sees its own.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;
use std::path::Path;

/// Function name used for log calls made outside any entered frame.
pub const MODULE_FUNCTION: &str = "<module>";

/// Who is logging: source unit, optional enclosing type and function name.
///
/// Two identities are equal iff all three components match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameIdentity {
    unit: &'static str,
    owner: Option<&'static str>,
    function: &'static str,
}

impl FrameIdentity {
    pub const fn new(unit: &'static str, owner: Option<&'static str>, function: &'static str) -> Self {
        Self {
            unit,
            owner,
            function,
        }
    }

    /// Pseudo-identity for code that logs without having entered a frame.
    pub const fn module(unit: &'static str) -> Self {
        Self::new(unit, None, MODULE_FUNCTION)
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn owner(&self) -> Option<&'static str> {
        self.owner
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    /// `path` element of a rendered event: the unit's file name, followed by
    /// `.Owner` when the frame belongs to a type.
    pub fn path(&self) -> String {
        let file = Path::new(self.unit)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.unit);
        match self.owner {
            Some(owner) => format!("{file}.{owner}"),
            None => file.to_string(),
        }
    }

    /// `method` element of a rendered event.
    pub fn method(&self) -> &'static str {
        self.function
    }
}

impl fmt::Display for FrameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.path(), self.function)
    }
}

thread_local! {
    static CALL_CHAIN: RefCell<Vec<FrameIdentity>> = const { RefCell::new(Vec::new()) };
}

/// Scope guard returned by [`FrameGuard::enter`]; pops the frame on drop.
///
/// Not `Send`: the guard must be dropped on the thread whose chain it
/// modified.
#[must_use = "the frame is left as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FrameGuard {
    index: usize,
    _not_send: PhantomData<*const ()>,
}

impl FrameGuard {
    /// Push `identity` onto the calling thread's chain.
    pub fn enter(identity: FrameIdentity) -> Self {
        let index = CALL_CHAIN.with(|chain| {
            let mut chain = chain.borrow_mut();
            chain.push(identity);
            chain.len() - 1
        });
        Self {
            index,
            _not_send: PhantomData,
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        // Truncate instead of pop so a guard leaked by mem::forget further
        // down cannot leave stale frames above this one.
        let _ = CALL_CHAIN.try_with(|chain| chain.borrow_mut().truncate(self.index));
    }
}

/// Snapshot of the calling thread's chain at the moment of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain {
    /// The frame issuing the log call.
    pub frame: FrameIdentity,
    /// Live callers of `frame`, innermost first.
    pub ancestors: Vec<FrameIdentity>,
}

impl CallChain {
    /// Build a chain directly, innermost caller first in `ancestors`.
    pub fn new(frame: FrameIdentity, ancestors: Vec<FrameIdentity>) -> Self {
        Self { frame, ancestors }
    }

    /// Snapshot the current thread's chain; `location` names the module-level
    /// frame when no frame has been entered.
    pub fn capture(location: &'static Location<'static>) -> Self {
        CALL_CHAIN.with(|chain| {
            let chain = chain.borrow();
            match chain.split_last() {
                Some((frame, callers)) => Self {
                    frame: *frame,
                    ancestors: callers.iter().rev().copied().collect(),
                },
                None => Self {
                    frame: FrameIdentity::module(location.file()),
                    ancestors: Vec::new(),
                },
            }
        })
    }

    /// Identity of the innermost frame on the current thread.
    pub fn current(location: &'static Location<'static>) -> FrameIdentity {
        CALL_CHAIN.with(|chain| {
            chain
                .borrow()
                .last()
                .copied()
                .unwrap_or_else(|| FrameIdentity::module(location.file()))
        })
    }

    /// Whether `identity` is one of the live callers of the frame.
    pub fn has_ancestor(&self, identity: &FrameIdentity) -> bool {
        self.ancestors.contains(identity)
    }
}

/// Reduce a `type_name` of a nested helper fn to the enclosing function name.
///
/// `my_crate::worker::Job::run::f` becomes `run`; closure segments are
/// skipped so a frame entered inside a closure reports the function around it.
#[doc(hidden)]
pub fn strip_function_path(type_name: &'static str) -> &'static str {
    let mut path = type_name.strip_suffix("::f").unwrap_or(type_name);
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Name of the enclosing function, as a `&'static str`.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::frame::strip_function_path(type_name_of(f))
    }};
}

/// Enter a frame for the rest of the enclosing scope.
///
/// `enter_frame!()` identifies a free function; `enter_frame!(Self)` (or any
/// type) records the enclosing type as the frame's owner.
#[macro_export]
macro_rules! enter_frame {
    () => {
        let _nrt_frame_guard = $crate::frame::FrameGuard::enter($crate::frame::FrameIdentity::new(
            file!(),
            None,
            $crate::function_name!(),
        ));
    };
    ($owner:ty) => {
        let _nrt_frame_guard = $crate::frame::FrameGuard::enter($crate::frame::FrameIdentity::new(
            file!(),
            Some($crate::frame::short_type_name::<$owner>()),
            $crate::function_name!(),
        ));
    };
}
