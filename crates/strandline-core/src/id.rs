//! Identity types for program entities.
//!
//! Two families of identifiers live here:
//! - **Handles** ([`OpId`], [`ListId`]): opaque `u32` newtypes giving stable
//!   identity to operations and operation lists. They are allocated by a
//!   [`HandleAllocator`] and never serialized, so a module freshly loaded from
//!   JSON carries [`OpId::UNASSIGNED`] / [`ListId::UNASSIGNED`] until it enters
//!   a store.
//! - **Keys** ([`FunctionId`], [`ModuleUrl`]): the string keys that modules
//!   use on disk and in call targets.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable handle of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct OpId(pub u32);

/// Stable handle of an operation list (a block body, a guard, a lambda body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ListId(pub u32);

impl OpId {
    /// Marker for an operation that has not been given a handle yet.
    pub const UNASSIGNED: OpId = OpId(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl ListId {
    /// Marker for a list that has not been given a handle yet.
    pub const UNASSIGNED: ListId = ListId(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

/// Function key within a module's function table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        FunctionId(id.into())
    }

    /// Generates a fresh, hyphen-free random id for a new function.
    pub fn fresh() -> Self {
        FunctionId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Location of a module. Also the key of the module store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleUrl(pub String);

impl ModuleUrl {
    pub fn new(url: impl Into<String>) -> Self {
        ModuleUrl(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URL of the next version of this module: the last path
    /// segment is replaced with a fresh random id.
    pub fn next_version(&self) -> ModuleUrl {
        let fresh = Uuid::new_v4().simple().to_string();
        match self.0.rfind('/') {
            Some(idx) => ModuleUrl(format!("{}/{}", &self.0[..idx], fresh)),
            None => ModuleUrl(fresh),
        }
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ModuleUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocates handles. Starts at 1 so that 0 stays the "unassigned" marker.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        HandleAllocator { next: 1 }
    }

    pub fn op(&mut self) -> OpId {
        OpId(self.bump())
    }

    pub fn list(&mut self) -> ListId {
        ListId(self.bump())
    }

    fn bump(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_hands_out_unassigned() {
        let mut alloc = HandleAllocator::new();
        let op = alloc.op();
        let list = alloc.list();
        assert!(op.is_assigned());
        assert!(list.is_assigned());
        assert_ne!(op.0, list.0);
    }

    #[test]
    fn default_handles_are_unassigned() {
        assert!(!OpId::default().is_assigned());
        assert!(!ListId::default().is_assigned());
    }

    #[test]
    fn fresh_function_ids_are_distinct_and_hyphen_free() {
        let a = FunctionId::fresh();
        let b = FunctionId::fresh();
        assert_ne!(a, b);
        assert!(!a.as_str().contains('-'));
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn next_version_replaces_last_segment() {
        let url = ModuleUrl::new("http://host:11739/module/abc");
        let next = url.next_version();
        assert!(next.as_str().starts_with("http://host:11739/module/"));
        assert_ne!(next, url);
        assert!(!next.as_str().ends_with("/abc"));
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let json = serde_json::to_string(&FunctionId::new("1f")).unwrap();
        assert_eq!(json, "\"1f\"");
        let back: ModuleUrl = serde_json::from_str("\"mem://core\"").unwrap();
        assert_eq!(back, ModuleUrl::new("mem://core"));
    }
}
