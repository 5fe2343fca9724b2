//! Synthetic tree fixtures
//!
//! A fixture is the full server-side tree a test or benchmark pretends to fetch
//! from. Generation is seeded; the same [`WorkloadConfig`] always yields the
//! same nodes.

use crate::cache::ordering::compare_siblings;
use crate::config::WorkloadConfig;
use crate::fetch::Page;
use crate::models::{Node, NodeId, PageInfo};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Spread of generated `created_at` values after the epoch (one year)
const CREATED_AT_SPREAD_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Timestamp every generated `created_at` is offset from
pub fn fixture_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_default()
}

/// A random `created_at` within the fixture's time range
pub(crate) fn random_created_at(rng: &mut StdRng) -> DateTime<Utc> {
    fixture_epoch() + Duration::milliseconds(rng.gen_range(0..CREATED_AT_SPREAD_MS))
}

/// One page of a fixture listing, tagged with the parent it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBatch {
    pub parent_id: Option<NodeId>,
    pub page: Page,
}

/// A complete generated tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FixtureFile")]
pub struct Fixture {
    /// Seed the fixture was generated from
    pub seed: u64,

    /// Every node, parents before their children
    pub nodes: Vec<Node>,

    #[serde(skip)]
    index: HashMap<NodeId, usize>,

    #[serde(skip)]
    listings: HashMap<Option<NodeId>, Vec<usize>>,
}

#[derive(Deserialize)]
struct FixtureFile {
    seed: u64,
    nodes: Vec<Node>,
}

impl From<FixtureFile> for Fixture {
    fn from(file: FixtureFile) -> Self {
        Fixture::from_nodes(file.seed, file.nodes)
    }
}

impl Fixture {
    /// Build a fixture from node records, deriving `has_children` and the
    /// per-parent listings in sibling order.
    pub fn from_nodes(seed: u64, mut nodes: Vec<Node>) -> Self {
        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();

        let mut listings: HashMap<Option<NodeId>, Vec<usize>> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            listings.entry(node.parent_id.clone()).or_default().push(i);
        }
        for listing in listings.values_mut() {
            listing.sort_by(|a, b| compare_siblings(&nodes[*a], &nodes[*b]));
        }

        for node in nodes.iter_mut() {
            node.has_children = listings.contains_key(&Some(node.id.clone()));
        }

        Self {
            seed,
            nodes,
            index,
            listings,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|i| &self.nodes[*i])
    }

    /// Top-level nodes in sibling order
    pub fn roots(&self) -> Vec<&Node> {
        self.listing(None)
    }

    /// Children of `id` in sibling order
    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        self.listing(Some(id))
    }

    fn listing(&self, parent: Option<&str>) -> Vec<&Node> {
        self.listings
            .get(&parent.map(str::to_string))
            .map(|listing| listing.iter().map(|i| &self.nodes[*i]).collect())
            .unwrap_or_default()
    }

    /// Parents with at least one child; `None` stands for the top level
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents: Vec<Option<NodeId>> = self.listings.keys().cloned().collect();
        parents.sort_by_key(|parent| {
            parent
                .as_ref()
                .and_then(|id| self.index.get(id).copied())
        });
        parents
    }

    /// Deepest node depth (roots are depth 0)
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&str, usize)> =
            self.roots().into_iter().map(|n| (n.id.as_str(), 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(
                self.children_of(id)
                    .into_iter()
                    .map(|n| (n.id.as_str(), depth + 1)),
            );
        }
        deepest
    }

    /// The slice of `parent`'s listing starting at `offset`
    pub fn page(&self, parent: Option<&str>, offset: usize, page_size: usize) -> Page {
        let listing = self.listing(parent);
        let end = offset.saturating_add(page_size).min(listing.len());
        let nodes: Vec<Node> = listing
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|node| (*node).clone())
            .collect();

        let info = if end < listing.len() {
            PageInfo::more(end.to_string())
        } else {
            PageInfo::last()
        };
        Page { nodes, info }
    }

    /// Every listing split into pages, in a seeded interleaved order.
    ///
    /// Pages of different parents are shuffled against each other, so children
    /// routinely arrive before their parents; pages of one parent keep their
    /// cursor order.
    pub fn pages(&self, page_size: usize, seed: u64) -> Vec<PageBatch> {
        let page_size = page_size.max(1);
        let mut rng = StdRng::seed_from_u64(seed);

        let parents = self.parents();
        let mut turns: Vec<usize> = Vec::new();
        for (slot, parent) in parents.iter().enumerate() {
            let count = self.listing(parent.as_deref()).len().div_ceil(page_size);
            turns.extend(std::iter::repeat(slot).take(count));
        }
        turns.shuffle(&mut rng);

        let mut offsets = vec![0usize; parents.len()];
        turns
            .into_iter()
            .map(|slot| {
                let parent = parents[slot].clone();
                let page = self.page(parent.as_deref(), offsets[slot], page_size);
                offsets[slot] += page_size;
                PageBatch {
                    parent_id: parent,
                    page,
                }
            })
            .collect()
    }

    /// Write the fixture as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create fixture file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    /// Read a fixture written by [`save`](Self::save)
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open fixture file {}", path.display()))?;
        let fixture = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        Ok(fixture)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Wide,
    Balanced,
    Deep,
}

impl Shape {
    fn pick(config: &WorkloadConfig, rng: &mut StdRng) -> Self {
        let total = config.total_weight();
        if total <= 0.0 {
            return Shape::Balanced;
        }
        let roll = rng.gen::<f64>() * total;
        if roll < config.wide_weight {
            Shape::Wide
        } else if roll < config.wide_weight + config.balanced_weight {
            Shape::Balanced
        } else {
            Shape::Deep
        }
    }
}

struct TreeBuilder {
    rng: StdRng,
    nodes: Vec<Node>,
    limit: usize,
}

impl TreeBuilder {
    fn full(&self) -> bool {
        self.nodes.len() >= self.limit
    }

    /// Append a node under `parent`; `None` once the target size is reached
    fn push(&mut self, parent: Option<usize>) -> Option<usize> {
        if self.full() {
            return None;
        }
        let index = self.nodes.len();
        let id = format!("n{}", index);
        let parent_id = parent.map(|p| self.nodes[p].id.clone());
        let created_at = random_created_at(&mut self.rng);
        self.nodes
            .push(Node::new(id.clone(), parent_id, format!("Node {}", index), created_at));
        Some(index)
    }

    fn wide(&mut self) {
        let Some(root) = self.push(None) else { return };
        let fanout = self.rng.gen_range(20..=200);
        for _ in 0..fanout {
            let Some(child) = self.push(Some(root)) else { return };
            let grandchildren = self.rng.gen_range(0..=3);
            for _ in 0..grandchildren {
                if self.push(Some(child)).is_none() {
                    return;
                }
            }
        }
    }

    fn balanced(&mut self) {
        let size = self.rng.gen_range(50..=500);
        let budget = self.nodes.len() + size;
        let Some(root) = self.push(None) else { return };

        let mut frontier = std::collections::VecDeque::from([root]);
        while let Some(parent) = frontier.pop_front() {
            let branching = self.rng.gen_range(2..=5);
            for _ in 0..branching {
                if self.nodes.len() >= budget {
                    return;
                }
                match self.push(Some(parent)) {
                    Some(child) => frontier.push_back(child),
                    None => return,
                }
            }
        }
    }

    fn deep(&mut self, max_depth: usize) {
        let Some(mut tip) = self.push(None) else { return };
        for _ in 1..max_depth {
            if self.rng.gen_bool(0.1) && self.push(Some(tip)).is_none() {
                return;
            }
            match self.push(Some(tip)) {
                Some(next) => tip = next,
                None => return,
            }
        }
    }
}

/// Generate a seeded fixture of `config.target_nodes` nodes mixing wide,
/// balanced and deep subtrees by the configured weights.
pub fn generate_fixture(config: &WorkloadConfig) -> Fixture {
    let mut builder = TreeBuilder {
        rng: StdRng::seed_from_u64(config.seed),
        nodes: Vec::with_capacity(config.target_nodes),
        limit: config.target_nodes,
    };

    while !builder.full() {
        match Shape::pick(config, &mut builder.rng) {
            Shape::Wide => builder.wide(),
            Shape::Balanced => builder.balanced(),
            Shape::Deep => builder.deep(config.max_depth.max(1)),
        }
    }

    let fixture = Fixture::from_nodes(config.seed, builder.nodes);
    tracing::debug!(
        seed = config.seed,
        nodes = fixture.len(),
        roots = fixture.roots().len(),
        "Generated fixture"
    );
    fixture
}
