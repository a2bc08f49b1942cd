//! Feature modules and the compile-time blueprint registry.
//!
//! A [`Blueprint`] bundles a set of routes with the DDL its tables need.
//! [`registry`] lists every blueprint the application ships with, in
//! registration order.

pub mod index;
pub mod system;

use crate::BootstrapError;
use axum::routing::MethodRouter;
use axum::Router;
use casedesk_db::DriverConnection;
use r2d2::ManageConnection;

/// A self-contained feature module.
#[derive(Clone, Copy)]
pub struct Blueprint {
    /// Name used in startup logs.
    pub name: &'static str,
    /// Adds the blueprint's routes.
    pub register: fn(AppRouter) -> AppRouter,
    /// `CREATE ... IF NOT EXISTS` statements run at development startup.
    pub schema: &'static [&'static str],
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("schema", &self.schema.len())
            .finish()
    }
}

/// Every blueprint the application ships with.
pub fn registry<M>() -> Vec<Blueprint>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    vec![index::blueprint(), system::blueprint::<M>()]
}

/// A router that remembers the path patterns registered on it.
#[derive(Default)]
pub struct AppRouter {
    router: Router,
    paths: Vec<String>,
    duplicates: Vec<String>,
}

impl AppRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. A path registered twice is reported by
    /// [`finish`](Self::finish) instead of panicking here.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        if self.paths.iter().any(|p| p == path) {
            self.duplicates.push(path.to_string());
            return self;
        }
        self.paths.push(path.to_string());
        self.router = self.router.route(path, method_router);
        self
    }

    /// Paths registered so far, in registration order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns the router and the table of its routes.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::DuplicateRoute`] naming the first path
    /// that was registered more than once.
    pub fn finish(self) -> Result<(Router, RouteTable), BootstrapError> {
        if let Some(path) = self.duplicates.into_iter().next() {
            return Err(BootstrapError::DuplicateRoute(path));
        }
        let mut routes = self.paths;
        routes.sort();
        Ok((self.router, RouteTable { routes }))
    }
}

/// The sorted list of route patterns served by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<String>,
}

impl RouteTable {
    pub fn routes(&self) -> &[String] {
        &self.routes
    }
}

/// Applies each blueprint's routes in order.
pub fn register_blueprints(mut router: AppRouter, blueprints: &[Blueprint]) -> AppRouter {
    for blueprint in blueprints {
        let before = router.paths().len();
        router = (blueprint.register)(router);
        tracing::info!(
            blueprint = blueprint.name,
            routes = router.paths().len() - before,
            "registered blueprint"
        );
    }
    router
}
