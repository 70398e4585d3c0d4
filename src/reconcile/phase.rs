use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Reconcilable, WorkingItem};
use crate::database::models::{Phase, PhaseStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order_num: i32,
    #[serde(default)]
    pub status: PhaseStatus,
}

impl PhaseDraft {
    pub fn blank(order_num: i32) -> Self {
        Self {
            name: String::new(),
            description: None,
            order_num,
            status: PhaseStatus::Pending,
        }
    }

    pub fn named(name: impl Into<String>, order_num: i32) -> Self {
        Self { name: name.into(), ..Self::blank(order_num) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPhase {
    pub name: String,
    pub description: Option<String>,
    pub order_num: i32,
    pub status: PhaseStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseUpdate {
    pub name: String,
    pub description: Option<String>,
    pub order_num: i32,
    pub status: PhaseStatus,
}

impl Reconcilable for PhaseDraft {
    type Id = Uuid;
    type Insert = NewPhase;
    type Update = PhaseUpdate;

    fn insert_payload(&self) -> Option<NewPhase> {
        if self.name.is_empty() {
            return None;
        }
        Some(NewPhase {
            name: self.name.clone(),
            description: self.description.clone(),
            order_num: self.order_num,
            status: self.status,
        })
    }

    fn update_payload(&self) -> PhaseUpdate {
        PhaseUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            order_num: self.order_num,
            status: self.status,
        }
    }
}

impl From<&Phase> for WorkingItem<PhaseDraft> {
    fn from(row: &Phase) -> Self {
        WorkingItem::existing(
            row.id,
            PhaseDraft {
                name: row.name.clone(),
                description: row.description.clone(),
                order_num: row.order_num,
                status: row.status,
            },
        )
    }
}

/// Ordered phases of one project. `order_num` is kept at 1..=len after every
/// structural change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseList {
    items: Vec<WorkingItem<PhaseDraft>>,
}

impl PhaseList {
    /// Takes the list order as given and renumbers it.
    pub fn new(items: Vec<WorkingItem<PhaseDraft>>) -> Self {
        let mut list = Self { items };
        list.renumber();
        list
    }

    pub fn items(&self) -> &[WorkingItem<PhaseDraft>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<WorkingItem<PhaseDraft>> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push_blank(&mut self) {
        self.items.push(WorkingItem::new(PhaseDraft::blank(0)));
        self.renumber();
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn insert_at(&mut self, index: usize, draft: PhaseDraft) {
        let index = index.min(self.items.len());
        self.items.insert(index, WorkingItem::new(draft));
        self.renumber();
    }

    pub fn remove(&mut self, index: usize) -> Option<WorkingItem<PhaseDraft>> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Drop new phases that could never be inserted, so the remaining
    /// payloads carry contiguous order numbers.
    pub fn prune_incomplete(&mut self) {
        self.items.retain(|item| item.is_existing() || item.value.is_complete());
        self.renumber();
    }

    /// Field edits only; ordering stays owned by the list.
    pub fn get_mut(&mut self, index: usize) -> Option<PhaseEdit<'_>> {
        self.items.get_mut(index).map(|item| PhaseEdit { draft: &mut item.value })
    }

    fn renumber(&mut self) {
        for (position, item) in self.items.iter_mut().enumerate() {
            item.value.order_num = position as i32 + 1;
        }
    }
}

/// Mutable access to one phase's fields, excluding `order_num`.
pub struct PhaseEdit<'a> {
    draft: &'a mut PhaseDraft,
}

impl PhaseEdit<'_> {
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.draft.name = name.into();
        self
    }

    pub fn set_description(&mut self, description: Option<String>) -> &mut Self {
        self.draft.description = description;
        self
    }

    pub fn set_status(&mut self, status: PhaseStatus) -> &mut Self {
        self.draft.status = status;
        self
    }
}
