use std::fmt;

use crate::checking::Rule;
use crate::store::RecordKind;

/// Set of record kinds, as a bitset over [`RecordKind::index`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u16);

impl KindSet {
    /// No kinds.
    pub const EMPTY: KindSet = KindSet(0);
    /// Every kind.
    pub const ALL: KindSet = KindSet::of(&RecordKind::ALL);

    /// The set holding exactly `kinds`.
    pub const fn of(kinds: &[RecordKind]) -> KindSet {
        let mut bits = 0u16;
        let mut idx = 0;
        while idx < kinds.len() {
            bits |= 1 << kinds[idx] as u16;
            idx += 1;
        }
        KindSet(bits)
    }

    /// Whether `kind` is a member.
    pub fn contains(self, kind: RecordKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    /// Members of either set.
    pub fn union(self, other: KindSet) -> KindSet {
        KindSet(self.0 | other.0)
    }

    /// Members in scheduling order.
    pub fn iter(self) -> impl Iterator<Item = RecordKind> {
        RecordKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Set of rules, as a bitset over [`Rule::index`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RuleSet(u32);

impl RuleSet {
    /// No rules.
    pub const EMPTY: RuleSet = RuleSet(0);

    /// Adds a rule.
    pub fn with(self, rule: Rule) -> RuleSet {
        RuleSet(self.0 | (1 << rule.index()))
    }

    /// Whether `rule` is a member.
    pub fn contains(self, rule: Rule) -> bool {
        self.0 & (1 << rule.index()) != 0
    }

    /// Members of either set.
    pub fn union(self, other: RuleSet) -> RuleSet {
        RuleSet(self.0 | other.0)
    }

    /// Members of both sets.
    pub fn intersection(self, other: RuleSet) -> RuleSet {
        RuleSet(self.0 & other.0)
    }

    /// Whether the set has no members.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Rule> {
        Rule::ALL.into_iter().filter(move |rule| self.contains(*rule))
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        iter.into_iter().fold(RuleSet::EMPTY, RuleSet::with)
    }
}

/// A named selection of the stores whose records may be dereferenced.
///
/// A filter answers "while checking a record, which referenced stores do we
/// validate against?". The rules it enables for a record kind are exactly the
/// rules of that kind whose referenced store is a target. Filters compose by
/// union of their targets.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    name: &'static str,
    targets: KindSet,
}

impl Filter {
    /// Validate every reference.
    pub const EVERYTHING: Filter = Filter {
        name: "EVERYTHING",
        targets: KindSet::ALL,
    };
    /// Validate references into the node store.
    pub const NODES_ONLY: Filter = Filter {
        name: "NODES_ONLY",
        targets: KindSet::of(&[RecordKind::Node]),
    };
    /// Validate references into the relationship and relationship type stores.
    pub const RELATIONSHIPS_ONLY: Filter = Filter {
        name: "RELATIONSHIPS_ONLY",
        targets: KindSet::of(&[RecordKind::Relationship, RecordKind::RelationshipType]),
    };
    /// Validate references into the property and property index stores.
    pub const PROPERTIES_ONLY: Filter = Filter {
        name: "PROPERTIES_ONLY",
        targets: KindSet::of(&[RecordKind::Property, RecordKind::PropertyIndex]),
    };
    /// Validate references into the string store.
    pub const STRINGS_ONLY: Filter = Filter {
        name: "STRINGS_ONLY",
        targets: KindSet::of(&[RecordKind::String]),
    };
    /// Validate references into the array store.
    pub const ARRAYS_ONLY: Filter = Filter {
        name: "ARRAYS_ONLY",
        targets: KindSet::of(&[RecordKind::Array]),
    };

    /// Filter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stores this filter validates references into.
    pub fn targets(&self) -> KindSet {
        self.targets
    }

    /// Rules enabled for records of `kind`.
    pub fn rules_for(&self, kind: RecordKind) -> RuleSet {
        Rule::ALL
            .into_iter()
            .filter(|rule| rule.applies_to(kind) && self.targets.contains(rule.target(kind)))
            .collect()
    }

    /// Union of the targets of several filters.
    pub fn combined_targets(filters: &[Filter]) -> KindSet {
        filters
            .iter()
            .fold(KindSet::EMPTY, |targets, filter| targets.union(filter.targets))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
