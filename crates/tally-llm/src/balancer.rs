//! Load balancing within one priority tier

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use rand::Rng;

use crate::config::{ProviderInstance, Strategy};

/// Selects one instance from a group of same-priority instances.
///
/// Round-robin cursors are per-tier atomics: a race between concurrent
/// requests can skip or repeat a pick but never corrupt state.
#[derive(Default)]
pub struct LoadBalancer {
    cursors: DashMap<i32, AtomicUsize>,
}

impl LoadBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick one instance from `group` (all sharing one priority value).
    ///
    /// Empty group → `None`. A single-member group bypasses the strategy.
    pub fn select<'a>(
        &self,
        group: &'a [ProviderInstance],
        strategy: Strategy,
    ) -> Option<&'a ProviderInstance> {
        match group {
            [] => None,
            [only] => Some(only),
            _ => Some(match strategy {
                Strategy::RoundRobin => self.round_robin(group),
                Strategy::Weighted => weighted(group),
                Strategy::Random => {
                    let index = rand::thread_rng().gen_range(0..group.len());
                    &group[index]
                }
            }),
        }
    }

    fn round_robin<'a>(&self, group: &'a [ProviderInstance]) -> &'a ProviderInstance {
        let cursor = self
            .cursors
            .entry(group[0].priority)
            .or_insert_with(|| AtomicUsize::new(0));
        let index = cursor.fetch_add(1, Ordering::Relaxed);
        &group[index % group.len()]
    }
}

/// Cumulative-weight sampling: draw uniform in (0, Σweight), walk the
/// cumulative sums until exceeded.
fn weighted(group: &[ProviderInstance]) -> &ProviderInstance {
    let total: f64 = group.iter().map(|p| p.weight.max(1) as f64).sum();
    let mut draw = rand::thread_rng().gen_range(0.0..total);
    for instance in group {
        draw -= instance.weight.max(1) as f64;
        if draw < 0.0 {
            return instance;
        }
    }
    // Floating-point edge; the draw landed exactly on the total.
    &group[group.len() - 1]
}
