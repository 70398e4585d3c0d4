//! Collection reconciliation for project edits.
//!
//! A project's team and roadmap are edited as lists. On save, the edited
//! working copy is diffed against the snapshot loaded when editing began and
//! turned into three disjoint operation lists: rows to delete, rows to update
//! and rows to insert. The diff is pure; [`apply_plan`] issues it against a
//! gateway.

pub mod apply;
pub mod membership;
pub mod phase;

pub use apply::{apply_plan, ApplyError, ApplyReport, ApplyScope, ApplyStep};
pub use membership::{MemberDraft, MemberUpdate, NewMember};
pub use phase::{NewPhase, PhaseDraft, PhaseList, PhaseUpdate};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// An entity edited as a list and persisted row by row.
pub trait Reconcilable {
    type Id: Clone + Eq + Hash + Debug;
    /// Full row written for a new item (minus the owning project).
    type Insert: Clone + PartialEq + Debug;
    /// Mutable fields only. Identity and ownership are never rewritten.
    type Update: Clone + PartialEq + Debug;

    /// The insert payload, or `None` while required fields are missing.
    fn insert_payload(&self) -> Option<Self::Insert>;

    fn update_payload(&self) -> Self::Update;

    fn is_complete(&self) -> bool {
        self.insert_payload().is_some()
    }
}

/// One row of the working copy. `identity` is present only for persisted rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, T::Id: Serialize",
    deserialize = "T: Deserialize<'de>, T::Id: Deserialize<'de>"
))]
pub struct WorkingItem<T: Reconcilable> {
    #[serde(default, rename = "id")]
    pub identity: Option<T::Id>,
    #[serde(flatten)]
    pub value: T,
}

impl<T: Reconcilable> WorkingItem<T> {
    pub fn existing(identity: T::Id, value: T) -> Self {
        Self { identity: Some(identity), value }
    }

    pub fn new(value: T) -> Self {
        Self { identity: None, value }
    }

    pub fn is_existing(&self) -> bool {
        self.identity.is_some()
    }
}

/// The persisted state a working copy was loaded from.
#[derive(Debug, Clone)]
pub struct Snapshot<T: Reconcilable> {
    ids: Vec<T::Id>,
    originals: HashMap<T::Id, T::Update>,
    protected: HashSet<T::Id>,
}

impl<T: Reconcilable> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            originals: HashMap::new(),
            protected: HashSet::new(),
        }
    }
}

impl<T: Reconcilable> Snapshot<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Identities only. Every existing working item is then reported as an update.
    pub fn from_ids(ids: impl IntoIterator<Item = T::Id>) -> Self {
        let mut snapshot = Self::default();
        for id in ids {
            snapshot.push_id(id);
        }
        snapshot
    }

    /// Identities plus the mutable fields each row had, so unchanged rows
    /// produce no update.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a WorkingItem<T>>) -> Self
    where
        T: 'a,
    {
        let mut snapshot = Self::default();
        for item in items {
            if let Some(id) = &item.identity {
                if snapshot.push_id(id.clone()) {
                    snapshot.originals.insert(id.clone(), item.value.update_payload());
                }
            }
        }
        snapshot
    }

    /// Never delete or rewrite `id`, whatever the working copy says.
    pub fn protect(mut self, id: T::Id) -> Self {
        self.protected.insert(id);
        self
    }

    pub fn ids(&self) -> &[T::Id] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push_id(&mut self, id: T::Id) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowUpdate<Id, U> {
    pub id: Id,
    pub fields: U,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<T: Reconcilable> {
    pub to_delete: Vec<T::Id>,
    pub to_update: Vec<RowUpdate<T::Id, T::Update>>,
    pub to_insert: Vec<T::Insert>,
}

impl<T: Reconcilable> Default for ReconcilePlan<T> {
    fn default() -> Self {
        Self {
            to_delete: Vec::new(),
            to_update: Vec::new(),
            to_insert: Vec::new(),
        }
    }
}

impl<T: Reconcilable> ReconcilePlan<T> {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_update.is_empty() && self.to_insert.is_empty()
    }
}

/// Diff `working` against `snapshot`.
///
/// - deletes: snapshot ids missing from `working`, in load order, never protected ids
/// - updates: existing items, once per id, skipping protected ids and rows
///   whose recorded original fields are unchanged
/// - inserts: new items with a complete insert payload; incomplete ones are dropped
pub fn reconcile<T: Reconcilable>(snapshot: &Snapshot<T>, working: &[WorkingItem<T>]) -> ReconcilePlan<T> {
    let present: HashSet<&T::Id> = working.iter().filter_map(|item| item.identity.as_ref()).collect();

    let to_delete = snapshot
        .ids
        .iter()
        .filter(|id| !present.contains(id) && !snapshot.protected.contains(*id))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let mut to_update = Vec::new();
    let mut to_insert = Vec::new();

    for item in working {
        match &item.identity {
            Some(id) => {
                if snapshot.protected.contains(id) || !seen.insert(id) {
                    continue;
                }
                let fields = item.value.update_payload();
                if snapshot.originals.get(id) == Some(&fields) {
                    continue;
                }
                to_update.push(RowUpdate { id: id.clone(), fields });
            }
            None => {
                if let Some(payload) = item.value.insert_payload() {
                    to_insert.push(payload);
                }
            }
        }
    }

    ReconcilePlan { to_delete, to_update, to_insert }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PhaseStatus;
    use uuid::Uuid;

    fn member(role: &str, user_id: Option<Uuid>) -> MemberDraft {
        MemberDraft { user_id, role: role.to_string() }
    }

    #[test]
    fn edit_remove_and_add_member() {
        let (id1, id2) = (Uuid::new_v4(), Uuid::new_v4());
        let (user_a, user_b, user_c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let loaded = vec![
            WorkingItem::existing(id1, member("dev", Some(user_a))),
            WorkingItem::existing(id2, member("qa", Some(user_b))),
        ];
        let snapshot = Snapshot::from_ids(loaded.iter().filter_map(|i| i.identity));

        let working = vec![
            WorkingItem::existing(id1, member("lead", Some(user_a))),
            WorkingItem::new(member("design", Some(user_c))),
        ];
        let plan = reconcile(&snapshot, &working);

        assert_eq!(plan.to_delete, vec![id2]);
        assert_eq!(plan.to_update, vec![RowUpdate { id: id1, fields: MemberUpdate { role: "lead".to_string() } }]);
        assert_eq!(plan.to_insert, vec![NewMember { user_id: user_c, role: "design".to_string() }]);
    }

    #[test]
    fn new_member_without_role_is_dropped() {
        let working = vec![WorkingItem::new(member("", Some(Uuid::new_v4())))];
        let plan = reconcile(&Snapshot::empty(), &working);
        assert!(plan.is_empty());
    }

    #[test]
    fn new_member_without_user_is_dropped() {
        let working = vec![WorkingItem::new(member("dev", None))];
        assert!(reconcile(&Snapshot::empty(), &working).to_insert.is_empty());
    }

    #[test]
    fn empty_snapshot_never_deletes() {
        let working: Vec<WorkingItem<MemberDraft>> = vec![];
        let plan = reconcile(&Snapshot::empty(), &working);
        assert!(plan.to_delete.is_empty());

        let working = vec![WorkingItem::existing(Uuid::new_v4(), member("dev", Some(Uuid::new_v4())))];
        assert!(reconcile(&Snapshot::empty(), &working).to_delete.is_empty());
    }

    #[test]
    fn protected_row_is_never_deleted_or_rewritten() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let snapshot = Snapshot::<MemberDraft>::from_ids([own, other]).protect(own);

        let plan = reconcile(&snapshot, &[]);
        assert_eq!(plan.to_delete, vec![other]);

        let working = vec![WorkingItem::existing(own, member("viewer", Some(Uuid::new_v4())))];
        let plan = reconcile(&snapshot, &working);
        assert!(plan.to_update.is_empty());
    }

    #[test]
    fn ids_only_snapshot_updates_every_existing_item() {
        let id = Uuid::new_v4();
        let working = vec![WorkingItem::existing(id, member("dev", Some(Uuid::new_v4())))];
        let plan = reconcile(&Snapshot::from_ids([id]), &working);
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn recorded_snapshot_skips_unchanged_rows() {
        let user = Some(Uuid::new_v4());
        let loaded = vec![
            WorkingItem::existing(Uuid::new_v4(), member("dev", user)),
            WorkingItem::existing(Uuid::new_v4(), member("qa", user)),
        ];
        let snapshot = Snapshot::from_items(&loaded);
        assert!(reconcile(&snapshot, &loaded).is_empty());

        let mut edited = loaded.clone();
        edited[1].value.role = "lead".to_string();
        let plan = reconcile(&snapshot, &edited);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].id, loaded[1].identity.unwrap());
    }

    #[test]
    fn duplicate_identity_updates_once() {
        let id = Uuid::new_v4();
        let working = vec![
            WorkingItem::existing(id, member("a", None)),
            WorkingItem::existing(id, member("b", None)),
        ];
        let plan = reconcile(&Snapshot::from_ids([id]), &working);
        assert_eq!(plan.to_update, vec![RowUpdate { id, fields: MemberUpdate { role: "a".to_string() } }]);
    }

    #[test]
    fn phase_payloads_carry_renumbered_order() {
        let first = Uuid::new_v4();
        let mut list = PhaseList::new(vec![
            WorkingItem::existing(first, PhaseDraft::named("Design", 1)),
            WorkingItem::existing(Uuid::new_v4(), PhaseDraft::named("Build", 2)),
            WorkingItem::new(PhaseDraft::named("Launch", 3)),
        ]);
        let snapshot = Snapshot::from_items(list.items());
        list.remove(1);

        let plan = reconcile(&snapshot, list.items());
        assert_eq!(plan.to_delete.len(), 1);
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].order_num, 2);
        assert_eq!(plan.to_insert[0].status, PhaseStatus::Pending);
    }

    #[test]
    fn working_items_travel_as_flat_json() {
        let id = Uuid::new_v4();
        let user = Uuid::new_v4();
        let item = WorkingItem::existing(id, member("dev", Some(user)));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, serde_json::json!({ "id": id, "user_id": user, "role": "dev" }));

        let back: WorkingItem<MemberDraft> = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);

        let fresh: WorkingItem<MemberDraft> =
            serde_json::from_value(serde_json::json!({ "user_id": "", "role": "qa" })).unwrap();
        assert!(!fresh.is_existing());
        assert_eq!(fresh.value.user_id, None);
    }
}
