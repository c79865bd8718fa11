//! Read-only traversal of the model tree.
use crate::region::Region;
use crate::sector::Sector;
use crate::subsector::Subsector;
use crate::technology::Technology;

/// A reporting collaborator which walks the model tree for one period.
///
/// Parents are always visited before their children and every entity is visited exactly once per
/// traversal. All methods do nothing by default, so implementors only need to override the levels
/// they are interested in.
pub trait ModelVisitor {
    /// Visit a region
    fn visit_region(&mut self, _region: &Region, _period: usize) {}

    /// Visit a sector
    fn visit_sector(&mut self, _sector: &Sector, _period: usize) {}

    /// Visit a subsector
    fn visit_subsector(&mut self, _subsector: &Subsector, _period: usize) {}

    /// Visit a technology. The technology's parent subsector is also given, for context.
    fn visit_technology(&mut self, _subsector: &Subsector, _technology: &Technology, _period: usize) {
    }
}
