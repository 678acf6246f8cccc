//! Route table and dispatcher.
//!
//! Routes are tried in registration order. A route applies when its pattern
//! matches the whole path *and* the merged argument names (path captures plus
//! query keys) fit the names the route declared: every required name
//! present, nothing left over that is not declared optional. The first
//! applicable route wins, even if a later one would fit better. Several
//! routes may share one pattern and differ only in the query names they
//! accept.

use crate::config::RouterConfig;
use crate::host::{self, DirectoryItem, Host, HostError, SortMethod};
use crate::listitem::ListItem;
use crate::pattern::{ConstraintBuilder, ConstraintTable, Pattern, PatternError};
use crate::request::RequestState;
use crate::value::{ParamError, Params};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Handler = Box<dyn Fn(&mut Context<'_>, Params) -> Result<(), DispatchError>>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("A route could not be found in the route collection: {path}")]
    RouteNotFound { path: String },
    #[error("redirect depth limit of {limit} exceeded")]
    RedirectLimit { limit: usize },
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wrap an addon-specific error returned from a handler.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        DispatchError::Handler(err.into())
    }
}

pub struct Route {
    pattern: Pattern,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    handler: Handler,
}

impl Route {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    pub fn optional(&self) -> impl Iterator<Item = &str> {
        self.optional.iter().map(String::as_str)
    }

    /// `names - optional == required`
    pub fn accepts(&self, params: &Params) -> bool {
        let supplied: BTreeSet<&str> = params
            .keys()
            .filter(|name| !self.optional.contains(*name))
            .collect();
        supplied.len() == self.required.len()
            && self
                .required
                .iter()
                .all(|name| supplied.contains(name.as_str()))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.pattern.template())
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// Declares the argument names of a route before binding its handler.
///
/// Names captured by the path pattern start out required.
#[must_use = "a route is only registered once `to` is called"]
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    pattern: Pattern,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
}

impl RouteBuilder<'_> {
    /// Require a query argument.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.optional.remove(&name);
        self.required.insert(name);
        self
    }

    /// Accept an argument without requiring it.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.required.remove(&name);
        self.optional.insert(name);
        self
    }

    /// Bind the handler and append the route to the table.
    pub fn to<F>(self, handler: F)
    where
        F: Fn(&mut Context<'_>, Params) -> Result<(), DispatchError> + 'static,
    {
        tracing::debug!(
            template = %self.pattern.template(),
            regex = %self.pattern.regex().as_str(),
            "Registered route"
        );
        self.router.routes.push(Route {
            pattern: self.pattern,
            required: self.required,
            optional: self.optional,
            handler: Box::new(handler),
        });
    }
}

pub struct Router {
    routes: Vec<Route>,
    constraints: ConstraintTable,
    max_redirect_depth: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(&RouterConfig::default())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("constraints", &self.constraints)
            .field("max_redirect_depth", &self.max_redirect_depth)
            .finish()
    }
}

impl Router {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            constraints: ConstraintTable::default(),
            max_redirect_depth: config.max_redirect_depth,
        }
    }

    /// Make a constraint available to routes registered after this call.
    pub fn register_constraint(&mut self, name: impl Into<String>, builder: ConstraintBuilder) {
        let name = name.into();
        if self.constraints.contains(&name) {
            tracing::debug!(constraint = %name, "Replacing route constraint");
        }
        self.constraints.register(name, builder);
    }

    /// Compile `template` and start declaring a route for it.
    pub fn route(&mut self, template: &str) -> Result<RouteBuilder<'_>, PatternError> {
        let pattern = Pattern::compile(template, &self.constraints)?;
        let required = pattern.param_names().map(str::to_string).collect();
        Ok(RouteBuilder {
            router: self,
            pattern,
            required,
            optional: BTreeSet::new(),
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first applicable route and the arguments it would receive.
    pub fn resolve(&self, state: &RequestState) -> Result<(&Route, Params), DispatchError> {
        for route in &self.routes {
            let mut params = match route.pattern.match_path(state.path()) {
                None => continue,
                Some(Ok(params)) => params,
                Some(Err(err)) => {
                    tracing::debug!(template = %route.pattern.template(), "{err}");
                    continue;
                }
            };

            params.extend(state.query().clone());
            if route.accepts(&params) {
                return Ok((route, params));
            }
            tracing::debug!(
                template = %route.pattern.template(),
                supplied = ?params.keys().collect::<Vec<_>>(),
                required = ?route.required().collect::<Vec<_>>(),
                optional = ?route.optional().collect::<Vec<_>>(),
                "Arguments do not fit route"
            );
        }

        Err(DispatchError::RouteNotFound {
            path: state.full_path(),
        })
    }

    /// Run the handler of the first applicable route.
    pub fn dispatch(
        &self,
        state: &mut RequestState,
        host: &mut dyn Host,
        handle: i32,
    ) -> Result<(), DispatchError> {
        self.dispatch_at(state, host, handle, 0)
    }

    fn dispatch_at(
        &self,
        state: &mut RequestState,
        host: &mut dyn Host,
        handle: i32,
        depth: usize,
    ) -> Result<(), DispatchError> {
        if depth > self.max_redirect_depth {
            return Err(DispatchError::RedirectLimit {
                limit: self.max_redirect_depth,
            });
        }

        tracing::info!("Routing \"{}\"", state.full_path());
        let (route, params) = self.resolve(state)?;
        tracing::debug!(template = %route.pattern.template(), depth, "Route matched");

        let mut context = Context {
            router: self,
            state,
            host,
            handle,
            depth,
        };
        (route.handler)(&mut context, params)
    }
}

/// What a handler gets to work with while it runs.
pub struct Context<'a> {
    router: &'a Router,
    state: &'a mut RequestState,
    host: &'a mut dyn Host,
    handle: i32,
    depth: usize,
}

impl Context<'_> {
    pub fn handle(&self) -> i32 {
        self.handle
    }

    pub fn path(&self) -> &str {
        self.state.path()
    }

    pub fn query(&self) -> &Params {
        self.state.query()
    }

    pub fn full_path(&self) -> String {
        self.state.full_path()
    }

    /// Absolute link to another route of this addon.
    pub fn url_for(&self, path: &str, query: &Params) -> String {
        self.state.url_for(path, query)
    }

    /// Dispatch again, right now, for a different path and query.
    pub fn redirect(&mut self, path: &str, query: Params) -> Result<(), DispatchError> {
        self.state.retarget(path, query);
        self.router
            .dispatch_at(self.state, &mut *self.host, self.handle, self.depth + 1)
    }

    pub fn set_directory_items(
        &mut self,
        items: &[DirectoryItem],
        content: Option<&str>,
        sort_methods: &[SortMethod],
    ) -> Result<(), DispatchError> {
        host::set_directory_items(&mut *self.host, self.handle, items, content, sort_methods)?;
        Ok(())
    }

    pub fn set_resolved_url(&mut self, succeeded: bool, item: &ListItem) -> Result<(), DispatchError> {
        host::set_resolved_url(&mut *self.host, self.handle, succeeded, item)?;
        Ok(())
    }

    pub fn localized_string(&self, id: u32) -> String {
        self.host.localized_string(id)
    }

    pub fn setting_string(&self, key: &str) -> String {
        self.host.setting_string(key)
    }

    pub fn addon_info(&self, key: &str) -> String {
        self.host.addon_info(key)
    }

    pub fn translate_path(&self, path: &str) -> PathBuf {
        self.host.translate_path(path)
    }
}
