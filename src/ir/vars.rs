//! Interned generator variables and ordered variable sets.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

/// An interned generator variable. Ids are dense and assigned in
/// first-seen order, so ordering by id is deterministic per query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Var(pub u32);

impl Var {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Name table for one compilation.
#[derive(Clone, Debug, Default)]
pub struct VarTable {
    names: Vec<String>,
    ids: HashMap<String, Var>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Var {
        if let Some(&var) = self.ids.get(name) {
            return var;
        }
        let var = Var(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), var);
        var
    }

    pub fn lookup(&self, name: &str) -> Option<Var> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, var: Var) -> &str {
        self.names.get(var.index()).map(String::as_str).unwrap_or("?")
    }

    /// Whether `var` ranges over key paths (`**A`) rather than keys.
    pub fn is_deep(&self, var: Var) -> bool {
        is_deep_name(self.name(var))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `**A` names a deep variable: it is bound to every key path of its
/// collection, the empty path included.
pub fn is_deep_name(name: &str) -> bool {
    name.starts_with("**")
}

/// An ordered set of variables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VarSet(BTreeSet<Var>);

impl VarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(var: Var) -> Self {
        let mut set = Self::new();
        set.insert(var);
        set
    }

    pub fn insert(&mut self, var: Var) -> bool {
        self.0.insert(var)
    }

    pub fn contains(&self, var: Var) -> bool {
        self.0.contains(&var)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Var> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &VarSet) -> VarSet {
        VarSet(self.0.union(&other.0).copied().collect())
    }

    pub fn diff(&self, other: &VarSet) -> VarSet {
        VarSet(self.0.difference(&other.0).copied().collect())
    }

    pub fn intersect(&self, other: &VarSet) -> VarSet {
        VarSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn extend(&mut self, other: &VarSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn is_subset(&self, other: &VarSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &VarSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn overlaps(&self, other: &VarSet) -> bool {
        !self.is_disjoint(other)
    }

    /// Comma-separated names, e.g. `D0,K1`.
    pub fn display<'a>(&'a self, table: &'a VarTable) -> DisplaySet<'a> {
        DisplaySet { set: self, table }
    }
}

impl FromIterator<Var> for VarSet {
    fn from_iter<I: IntoIterator<Item = Var>>(iter: I) -> Self {
        VarSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a VarSet {
    type Item = Var;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, Var>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

pub struct DisplaySet<'a> {
    set: &'a VarSet,
    table: &'a VarTable,
}

impl fmt::Display for DisplaySet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, var) in self.set.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", self.table.name(var))?;
        }
        Ok(())
    }
}
