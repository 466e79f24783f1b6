//! Routine identity and code objects.

use std::fmt;

/// Immutable identity token shared by every invocation of the same source
/// routine. Keys the per-routine dispatch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineId(pub u64);

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "routine#{}", self.0)
    }
}

/// A routine's code object.
///
/// Immutable for the lifetime of the runtime; frames borrow it, dispatch
/// state hangs off its [`RoutineId`].
#[derive(Debug)]
pub struct Routine {
    id: RoutineId,
    name: String,
    source_url: String,
    first_line: u32,
}

impl Routine {
    /// Create a routine code object.
    pub fn new(
        id: RoutineId,
        name: impl Into<String>,
        source_url: impl Into<String>,
        first_line: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source_url: source_url.into(),
            first_line,
        }
    }

    /// The routine's identity token.
    pub fn id(&self) -> RoutineId {
        self.id
    }

    /// The routine's source-level name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL of the source the routine was loaded from.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// First source line of the routine body.
    pub fn first_line(&self) -> u32 {
        self.first_line
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.source_url, self.first_line)
    }
}

/// A compiled specialization of a routine.
///
/// Opaque to the dispatch layer: only the host knows how to execute it. The
/// id is unique per compilation, `routine` names the routine it specializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializedCode {
    id: u64,
    routine: RoutineId,
    name: String,
}

impl SpecializedCode {
    /// Create a specialization handle.
    pub fn new(id: u64, routine: RoutineId, name: impl Into<String>) -> Self {
        Self {
            id,
            routine,
            name: name.into(),
        }
    }

    /// Unique id of this compilation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The routine this code specializes.
    pub fn routine(&self) -> RoutineId {
        self.routine
    }

    /// Display name of the specialization.
    pub fn name(&self) -> &str {
        &self.name
    }
}
