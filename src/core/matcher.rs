use crate::core::cycles::{elementary_cycles, Cycle};
use crate::core::graph::PreferenceGraph;
use crate::core::grouping::{partition, ByLengthOfStay, GroupBy};
use crate::core::MatchingError;
use crate::models::Application;

/// Bounds that keep cycle enumeration tractable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchLimits {
    /// Largest compatibility group the enumerator will accept
    pub max_group_size: Option<usize>,
    /// Longest ring (in participants) worth proposing
    pub max_cycle_length: Option<usize>,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Partition the snapshot into compatibility groups
/// 2. Reject the run if any group exceeds the size limit
/// 3. Build the preference graph of each group
/// 4. Enumerate its elementary cycles
#[derive(Debug, Clone)]
pub struct Matcher<G = ByLengthOfStay> {
    group_by: G,
    limits: MatchLimits,
}

impl Matcher<ByLengthOfStay> {
    pub fn new(limits: MatchLimits) -> Self {
        Self {
            group_by: ByLengthOfStay,
            limits,
        }
    }
}

impl Default for Matcher<ByLengthOfStay> {
    fn default() -> Self {
        Self::new(MatchLimits::default())
    }
}

impl<G: GroupBy> Matcher<G> {
    /// Use a custom compatibility key
    pub fn with_grouping(group_by: G, limits: MatchLimits) -> Self {
        Self { group_by, limits }
    }

    /// Find every candidate ring in a snapshot of pending applications
    ///
    /// Accepted applications in the snapshot are ignored. Groups never
    /// interact; the result is the concatenation of each group's cycles in
    /// ascending key order.
    pub fn find_matching_application_sets(
        &self,
        applications: &[Application],
    ) -> Result<Vec<Cycle>, MatchingError> {
        let pending: Vec<Application> = applications
            .iter()
            .filter(|a| !a.accepted)
            .cloned()
            .collect();
        let groups = partition(&pending, &self.group_by);

        if let Some(limit) = self.limits.max_group_size {
            if let Some((key, group)) = groups.iter().find(|(_, g)| g.len() > limit) {
                return Err(MatchingError::GroupTooLarge {
                    key: format!("{:?}", key),
                    size: group.len(),
                    limit,
                });
            }
        }

        let mut all_cycles = Vec::new();
        for (key, group) in &groups {
            let graph = PreferenceGraph::build(group.iter().copied())?;
            let cycles = elementary_cycles(&graph, self.limits.max_cycle_length);

            tracing::debug!(
                "Group {:?}: {} applications, {} edges, {} cycles",
                key,
                graph.node_count(),
                graph.edge_count(),
                cycles.len()
            );

            all_cycles.extend(cycles);
        }

        Ok(all_cycles)
    }
}
