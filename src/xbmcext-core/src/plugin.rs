//! The object an addon builds once per invocation.

use crate::config::RouterConfig;
use crate::host::{self, DirectoryItem, Host, HostError, SortMethod};
use crate::listitem::ListItem;
use crate::paths::AddonDirs;
use crate::pattern::{ConstraintBuilder, PatternError};
use crate::request::{Invocation, RequestError, RequestState};
use crate::router::{DispatchError, RouteBuilder, Router};
use crate::value::Params;

/// Routes, request state and host for one addon invocation.
///
/// ```no_run
/// use xbmcext_core::{Invocation, Plugin, RecordingHost};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let invocation = Invocation::from_args(std::env::args().skip(1))?;
/// let mut plugin = Plugin::new(&invocation, RecordingHost::new())?;
///
/// plugin.route("/")?.to(|ctx, _| ctx.set_directory_items(&[], None, &[]));
/// plugin.route(r#"/title/{id:re("tt\d{7}")}"#)?.to(|_, params| {
///     println!("title {}", params.get_str("id").unwrap_or_default());
///     Ok(())
/// });
///
/// plugin.run()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Plugin<H: Host> {
    router: Router,
    state: RequestState,
    handle: i32,
    host: H,
}

impl<H: Host> Plugin<H> {
    pub fn new(invocation: &Invocation, host: H) -> Result<Self, RequestError> {
        Self::with_config(invocation, host, &RouterConfig::default())
    }

    pub fn with_config(
        invocation: &Invocation,
        host: H,
        config: &RouterConfig,
    ) -> Result<Self, RequestError> {
        let state = RequestState::from_invocation(invocation)?;
        tracing::debug!(
            handle = invocation.handle,
            scheme = %state.scheme(),
            authority = %state.authority(),
            path = %state.path(),
            "Plugin invoked"
        );
        Ok(Self {
            router: Router::new(config),
            state,
            handle: invocation.handle,
            host,
        })
    }

    pub fn register_constraint(&mut self, name: impl Into<String>, builder: ConstraintBuilder) {
        self.router.register_constraint(name, builder);
    }

    /// Declare a route; see [`crate::pattern`] for the template syntax.
    pub fn route(&mut self, template: &str) -> Result<RouteBuilder<'_>, PatternError> {
        self.router.route(template)
    }

    /// Dispatch the current request.
    pub fn run(&mut self) -> Result<(), DispatchError> {
        self.router
            .dispatch(&mut self.state, &mut self.host, self.handle)
    }

    /// Replace path and query, then dispatch again.
    pub fn redirect(&mut self, path: &str, query: Params) -> Result<(), DispatchError> {
        self.state.retarget(path, query);
        self.run()
    }

    pub fn full_path(&self) -> String {
        self.state.full_path()
    }

    pub fn url_for(&self, path: &str, query: &Params) -> String {
        self.state.url_for(path, query)
    }

    pub fn set_directory_items(
        &mut self,
        items: &[DirectoryItem],
        content: Option<&str>,
        sort_methods: &[SortMethod],
    ) -> Result<(), HostError> {
        host::set_directory_items(&mut self.host, self.handle, items, content, sort_methods)
    }

    pub fn set_resolved_url(&mut self, succeeded: bool, item: &ListItem) -> Result<(), HostError> {
        host::set_resolved_url(&mut self.host, self.handle, succeeded, item)
    }

    pub fn dirs(&self) -> AddonDirs {
        AddonDirs::from_host(&self.host)
    }

    pub fn handle(&self) -> i32 {
        self.handle
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{HostCall, RecordingHost};

    fn plugin(suffix: &str) -> Plugin<RecordingHost> {
        let invocation = Invocation::new("plugin://plugin.video.example", 9, suffix);
        Plugin::new(&invocation, RecordingHost::new().with_string(30000, "Movies")).unwrap()
    }

    #[test]
    fn run_passes_handle_to_host() {
        let mut plugin = plugin("/");
        plugin.route("/").unwrap().to(|ctx, _| {
            let url = ctx.url_for("/movies", &Params::new());
            ctx.set_directory_items(
                &[DirectoryItem::folder(url, ListItem::new(30000u32))],
                None,
                &[],
            )
        });

        plugin.run().unwrap();

        match &plugin.host().calls()[0] {
            HostCall::AddDirectoryItems { handle, items } => {
                assert_eq!(*handle, 9);
                assert_eq!(items[0].url, "plugin://plugin.video.example/movies");
                assert_eq!(items[0].item.label, crate::Label::Text("Movies".into()));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn redirect_from_outside_a_handler() {
        let mut plugin = plugin("/unknown");
        plugin
            .route("/play/{id}")
            .unwrap()
            .to(|ctx, params| {
                let item = ListItem::new("Stream").with_path(format!(
                    "https://cdn.example/{}.m3u8",
                    params.get_str("id").unwrap_or_default()
                ));
                ctx.set_resolved_url(true, &item)
            });

        assert!(matches!(
            plugin.run(),
            Err(DispatchError::RouteNotFound { .. })
        ));

        plugin.redirect("/play/abc", Params::new()).unwrap();
        assert_eq!(plugin.full_path(), "/play/abc");

        let calls = plugin.into_host().take_calls();
        assert!(matches!(
            &calls[..],
            [HostCall::SetResolvedUrl { succeeded: true, item, .. }]
                if item.path.as_deref() == Some("https://cdn.example/abc.m3u8")
        ));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let invocation = Invocation::new("not a url", 1, "/");
        assert!(Plugin::new(&invocation, RecordingHost::new()).is_err());
    }
}
