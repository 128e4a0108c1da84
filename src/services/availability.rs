use std::collections::HashMap;

use crate::models::{ClassRecord, StudentRecord};

/// Students per class id, rebuilt from every fetch and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyView {
    counts: HashMap<i64, usize>,
}

impl OccupancyView {
    pub fn from_students(students: &[StudentRecord]) -> Self {
        let mut counts = HashMap::new();
        for class_id in students.iter().filter_map(|s| s.class_id) {
            *counts.entry(class_id).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn occupied(&self, class_id: i64) -> usize {
        self.counts.get(&class_id).copied().unwrap_or(0)
    }
}

/// Advisory capacity state of one class. The backend performs the
/// authoritative check; another session may fill the class first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAvailability {
    pub class: ClassRecord,
    pub occupied: usize,
    pub label: String,
    pub is_full: bool,
}

impl ClassAvailability {
    pub fn resolve(class: &ClassRecord, occupancy: &OccupancyView) -> Self {
        let occupied = occupancy.occupied(class.id);
        Self {
            label: format!("{} ({}/{})", class.name, occupied, class.capacity),
            is_full: occupied as i64 >= class.capacity,
            occupied,
            class: class.clone(),
        }
    }

    /// Entry of the class management list.
    pub fn management_label(&self) -> String {
        format!(
            "{} ({}/{} alunos)",
            self.class.name, self.occupied, self.class.capacity
        )
    }
}

pub fn resolve_all(classes: &[ClassRecord], occupancy: &OccupancyView) -> Vec<ClassAvailability> {
    classes
        .iter()
        .map(|c| ClassAvailability::resolve(c, occupancy))
        .collect()
}
