//! Module for ordering sectors by their fuel dependencies
use crate::market::GoodID;
use crate::sector::Sector;
use anyhow::{Result, anyhow};
use petgraph::Directed;
use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::HashMap;

/// A graph of sectors, with an edge from each sector to the sectors supplying its fuels
type SectorGraph = Graph<GoodID, (), Directed>;

/// Create a graph with a node for every sector and an edge from a sector to each sector in the same
/// region which produces one of its fuels.
///
/// Fuels not produced by any sector (e.g. primary energy priced by the solver) add no edges.
fn create_sector_graph(sectors: &[Sector]) -> SectorGraph {
    let mut graph = Graph::new();
    let nodes: HashMap<&GoodID, NodeIndex> = sectors
        .iter()
        .map(|sector| (&sector.good, graph.add_node(sector.good.clone())))
        .collect();

    for sector in sectors {
        let consumer = nodes[&sector.good];
        for fuel in sector.fuels() {
            let Some(&supplier) = nodes.get(fuel) else {
                continue;
            };
            if !graph.contains_edge(consumer, supplier) {
                graph.add_edge(consumer, supplier, ());
            }
        }
    }

    graph
}

/// Order sectors so that every sector comes before the sectors supplying its fuels.
///
/// Calculating sectors in this order means that all of the demand for a sector's good is known
/// before the sector is calculated.
///
/// # Returns
///
/// The sectors in calculation order, or an error if the fuel dependencies contain a cycle.
pub fn order_sectors(sectors: Vec<Sector>) -> Result<Vec<Sector>> {
    let graph = create_sector_graph(&sectors);
    let order = toposort(&graph, None).map_err(|cycle| {
        let good = &graph[cycle.node_id()];
        anyhow!("Cycle detected in sector fuel dependencies for good {good}")
    })?;

    let mut sectors: Vec<_> = sectors.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|node| sectors[node.index()].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_time};
    use crate::period::ModelTime;
    use crate::subsector::Subsector;
    use crate::technology::Technology;
    use rstest::rstest;

    /// A sector with one technology consuming each of the given fuels
    fn sector_with_fuels(id: &str, fuels: &[&str], time: &ModelTime) -> Sector {
        let mut sector = Sector::new(id.into(), "GBR".into(), time);
        let mut subsector = Subsector::new(id.into(), "GBR".into(), id.into(), time);
        subsector.technologies = fuels
            .iter()
            .map(|fuel| Technology::new((*fuel).into(), Some((*fuel).into()), time))
            .collect();
        sector.subsectors.push(subsector);
        sector
    }

    fn ids(sectors: &[Sector]) -> Vec<&str> {
        sectors.iter().map(|s| &*s.id.0).collect()
    }

    #[rstest]
    fn test_order_sectors(model_time: ModelTime) {
        let sectors = vec![
            sector_with_fuels("electricity", &["gas", "coal"], &model_time),
            sector_with_fuels("gas", &[], &model_time),
            sector_with_fuels("buildings", &["electricity", "gas"], &model_time),
        ];
        let ordered = order_sectors(sectors).unwrap();
        assert_eq!(ids(&ordered), ["buildings", "electricity", "gas"]);
    }

    #[rstest]
    fn test_order_sectors_cycle(model_time: ModelTime) {
        let sectors = vec![
            sector_with_fuels("a", &["b"], &model_time),
            sector_with_fuels("b", &["a"], &model_time),
        ];
        assert!(order_sectors(sectors).is_err());
    }

    #[rstest]
    fn test_order_sectors_self_loop(model_time: ModelTime) {
        let sectors = vec![sector_with_fuels("a", &["a"], &model_time)];
        assert_error!(
            order_sectors(sectors),
            "Cycle detected in sector fuel dependencies for good a"
        );
    }
}
