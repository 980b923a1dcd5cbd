//! Long-haul link between routers of different subnets.

use crate::ids::RouterId;

/// Shared medium joining any number of routers.
///
/// A packet handed to the backbone goes to the first attached router whose
/// subnet matches the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backbone {
    routers: Vec<RouterId>,
}

impl Backbone {
    pub(crate) const fn new() -> Self {
        Self {
            routers: Vec::new(),
        }
    }

    /// Attached routers, in attachment order.
    #[must_use]
    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }

    pub(crate) fn add_router(&mut self, router: RouterId) {
        if !self.routers.contains(&router) {
            self.routers.push(router);
        }
    }

    pub(crate) fn remove_router(&mut self, router: RouterId) {
        self.routers.retain(|&r| r != router);
    }
}
