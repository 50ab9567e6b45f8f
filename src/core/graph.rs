use crate::core::MatchingError;
use crate::models::{Application, ApplicationId, CityId};
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;

/// Directed "would move into" graph over one compatibility group
///
/// An edge `a -> b` means applicant `a` lists the city of `b`'s property
/// among its preferred cities. Every application of the group is a node,
/// including those without any edge.
#[derive(Debug, Clone, Default)]
pub struct PreferenceGraph {
    graph: DiGraphMap<ApplicationId, ()>,
}

impl PreferenceGraph {
    /// Build the graph for one group
    ///
    /// Fails on the first application that has no property or whose
    /// property has no city: dropping it would silently shrink the pool.
    pub fn build<'a, I>(applications: I) -> Result<Self, MatchingError>
    where
        I: IntoIterator<Item = &'a Application>,
    {
        let applications: Vec<&Application> = applications.into_iter().collect();

        // city -> applications offering a property there
        let mut offered_in: BTreeMap<CityId, Vec<ApplicationId>> = BTreeMap::new();
        let mut graph = DiGraphMap::with_capacity(applications.len(), 0);

        for application in &applications {
            let property = application
                .property
                .as_ref()
                .ok_or(MatchingError::MissingProperty(application.id))?;
            let city = property.city_id.ok_or(MatchingError::MissingCity {
                application: application.id,
                property: property.id,
            })?;

            offered_in.entry(city).or_default().push(application.id);
            graph.add_node(application.id);
        }

        for application in &applications {
            for city in &application.preferred_cities {
                let Some(candidates) = offered_in.get(city) else {
                    continue;
                };
                for &candidate in candidates {
                    if candidate != application.id {
                        // GraphMap keeps at most one edge per ordered pair
                        graph.add_edge(application.id, candidate, ());
                    }
                }
            }
        }

        Ok(Self { graph })
    }

    /// Build directly from an edge list; mostly useful for tests and benches
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = ApplicationId>,
        E: IntoIterator<Item = (ApplicationId, ApplicationId)>,
    {
        let mut graph = DiGraphMap::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (from, to) in edges {
            if from != to {
                graph.add_edge(from, to, ());
            }
        }
        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_edge(&self, from: ApplicationId, to: ApplicationId) -> bool {
        self.graph.contains_edge(from, to)
    }

    pub(crate) fn inner(&self) -> &DiGraphMap<ApplicationId, ()> {
        &self.graph
    }
}
