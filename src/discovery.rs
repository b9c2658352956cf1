use crate::error::{Error, Result};
use crate::model::{ClassInfo, ClassRegistry};
use log::debug;
use std::rc::Rc;

/// Finds the endpoint classes that seed a traversal.
///
/// A class is an endpoint when it carries one of the marker attributes, matched
/// either by full path (`api::endpoint`) or by its last segment (`endpoint`).
pub struct EndpointDiscovery {
    markers: Vec<String>,
}

impl EndpointDiscovery {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// Returns the marked classes, ordered by qualified name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no marker attribute is configured.
    pub fn discover(&self, registry: &ClassRegistry) -> Result<Vec<Rc<ClassInfo>>> {
        if self.markers.is_empty() {
            return Err(Error::configuration("no endpoint attribute configured"));
        }

        let mut endpoints: Vec<Rc<ClassInfo>> = registry
            .classes()
            .filter(|class| self.markers.iter().any(|marker| class.has_annotation(marker)))
            .cloned()
            .collect();
        endpoints.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            "Discovered {} endpoints: {:?}",
            endpoints.len(),
            endpoints.iter().map(|e| e.name.as_str()).collect::<Vec<_>>()
        );
        Ok(endpoints)
    }
}
