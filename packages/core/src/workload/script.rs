//! Seeded mutation scripts
//!
//! A script is generated once against a [`Fixture`] and replayed against every
//! cache variant. The builder tracks a shadow copy of the parent links so the
//! operations it emits stay meaningful: moves never form cycles and removals
//! only hit leaves. Ids allocated by inserts are never referenced afterwards.

use crate::config::WorkloadConfig;
use crate::models::NodeId;
use crate::operations::Operation;
use crate::workload::fixture::{random_created_at, Fixture};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Separates the script's random stream from the fixture's
const SCRIPT_SEED_SALT: u64 = 0x5C21_97A0_D3E1_4B6F;

/// Random picks tried before giving up on a remove or move target
const PICK_ATTEMPTS: usize = 8;

/// Parent links and child counts as the script has left them
struct Shadow {
    parent: HashMap<NodeId, Option<NodeId>>,
    child_count: HashMap<NodeId, usize>,
    live: Vec<NodeId>,
    position: HashMap<NodeId, usize>,
}

impl Shadow {
    fn new(fixture: &Fixture) -> Self {
        let mut shadow = Self {
            parent: HashMap::with_capacity(fixture.len()),
            child_count: HashMap::new(),
            live: Vec::with_capacity(fixture.len()),
            position: HashMap::with_capacity(fixture.len()),
        };
        for node in &fixture.nodes {
            shadow
                .parent
                .insert(node.id.clone(), node.parent_id.clone());
            if let Some(parent) = &node.parent_id {
                *shadow.child_count.entry(parent.clone()).or_default() += 1;
            }
            shadow.position.insert(node.id.clone(), shadow.live.len());
            shadow.live.push(node.id.clone());
        }
        shadow
    }

    fn pick(&self, rng: &mut StdRng) -> Option<NodeId> {
        if self.live.is_empty() {
            return None;
        }
        Some(self.live[rng.gen_range(0..self.live.len())].clone())
    }

    fn children(&self, id: &str) -> usize {
        self.child_count.get(id).copied().unwrap_or(0)
    }

    /// Whether `candidate` is `ancestor` or lies below it
    fn descends_from(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent.get(id).and_then(|p| p.as_deref());
        }
        false
    }

    fn add_child(&mut self, parent: Option<&str>) {
        if let Some(parent) = parent {
            *self.child_count.entry(parent.to_string()).or_default() += 1;
        }
    }

    fn drop_child(&mut self, parent: Option<&str>) {
        if let Some(count) = parent.and_then(|p| self.child_count.get_mut(p)) {
            *count = count.saturating_sub(1);
        }
    }

    fn reparent(&mut self, id: &str, new_parent: Option<NodeId>) {
        let old = self.parent.insert(id.to_string(), new_parent.clone()).flatten();
        self.drop_child(old.as_deref());
        self.add_child(new_parent.as_deref());
    }

    fn remove(&mut self, id: &str) {
        let old = self.parent.remove(id).flatten();
        self.drop_child(old.as_deref());
        self.child_count.remove(id);
        if let Some(slot) = self.position.remove(id) {
            self.live.swap_remove(slot);
            if let Some(moved) = self.live.get(slot) {
                self.position.insert(moved.clone(), slot);
            }
        }
    }
}

/// Build the seeded mutation script for `fixture`.
///
/// Emits `config.mutation_count()` operations mixing inserts (~35%), moves
/// (~20%), leaf removals (~10%), collapse/expand (~25%) and pagination flips
/// (~10%). A collapse is followed by its expand either immediately or a few
/// operations later, so inserts and moves also land in collapsed parents.
pub fn build_script(fixture: &Fixture, config: &WorkloadConfig) -> Vec<Operation> {
    let target = config.mutation_count();
    let mut rng = StdRng::seed_from_u64(config.seed ^ SCRIPT_SEED_SALT);
    let mut shadow = Shadow::new(fixture);
    let mut collapsed: Vec<NodeId> = Vec::new();
    let mut script = Vec::with_capacity(target);

    while script.len() < target {
        // Pending expands come back at random points
        if !collapsed.is_empty() && rng.gen_bool(0.2) {
            let id = collapsed.swap_remove(rng.gen_range(0..collapsed.len()));
            script.push(Operation::Expand { id });
            continue;
        }

        let roll: f64 = rng.gen();
        let op = if roll < 0.35 {
            insert(&mut shadow, &mut rng)
        } else if roll < 0.55 {
            move_node(&mut shadow, &mut rng)
        } else if roll < 0.65 {
            remove_leaf(&mut shadow, &mut rng)
        } else if roll < 0.90 {
            shadow.pick(&mut rng).map(|id| {
                if rng.gen_bool(0.5) {
                    script.push(Operation::Collapse { id: id.clone() });
                    Operation::Expand { id }
                } else {
                    collapsed.push(id.clone());
                    Operation::Collapse { id }
                }
            })
        } else {
            let parent_id = if rng.gen_bool(0.2) {
                None
            } else {
                shadow.pick(&mut rng)
            };
            Some(Operation::SetHasMore {
                parent_id,
                has_more: rng.gen_bool(0.5),
            })
        };

        if let Some(op) = op {
            script.push(op);
        }
    }
    script.truncate(target);

    tracing::debug!(
        seed = config.seed,
        operations = script.len(),
        "Built mutation script"
    );
    script
}

fn insert(shadow: &mut Shadow, rng: &mut StdRng) -> Option<Operation> {
    let parent_id = if rng.gen_bool(0.05) {
        None
    } else {
        shadow.pick(rng)
    };
    shadow.add_child(parent_id.as_deref());
    Some(Operation::Insert {
        parent_id,
        created_at: random_created_at(rng),
    })
}

fn move_node(shadow: &mut Shadow, rng: &mut StdRng) -> Option<Operation> {
    let id = shadow.pick(rng)?;
    let mut new_parent_id = None;
    if !rng.gen_bool(0.1) {
        for _ in 0..PICK_ATTEMPTS {
            let Some(target) = shadow.pick(rng) else { break };
            if !shadow.descends_from(&target, &id) {
                new_parent_id = Some(target);
                break;
            }
        }
    }
    shadow.reparent(&id, new_parent_id.clone());
    Some(Operation::Move { id, new_parent_id })
}

fn remove_leaf(shadow: &mut Shadow, rng: &mut StdRng) -> Option<Operation> {
    for _ in 0..PICK_ATTEMPTS {
        let id = shadow.pick(rng)?;
        if shadow.children(&id) == 0 {
            shadow.remove(&id);
            return Some(Operation::Remove { id });
        }
    }
    None
}
