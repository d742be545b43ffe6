use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The daemon collects every module and merges the routes into a single
/// Router. Routes are absolute (a module decides its own `/api/...` prefix).
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes with state already applied.
    fn routes(&self) -> Router;
}
