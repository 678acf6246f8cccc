//! Helpers for media-center addons: a URL router for `plugin://` invocations
//! plus thin wrappers around the host's listing, playback and lookup callbacks.
//!
//! An addon process is started with a base URL, a numeric handle and a
//! path/query suffix. [`Plugin`] turns those into a [`RequestState`], lets the
//! addon declare routes such as `/title/{id:re("tt\d{7}")}` and dispatches the
//! request to the first route whose pattern and argument names fit.

pub mod config;
pub mod host;
pub mod listitem;
pub mod logging;
pub mod paths;
pub mod pattern;
pub mod plugin;
pub mod recording;
pub mod request;
pub mod router;
pub mod value;

pub use config::{
    Config, ConfigError, LogLevel, LogStream, LoggingConfig, RouterConfig, ValidationError,
};
pub use host::{DirectoryItem, Host, HostError, SortMethod};
pub use listitem::{ContextMenuItem, Label, ListItem};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AddonDirs, DirsError};
pub use pattern::{Coercion, ConstraintBuilder, ConstraintTable, Pattern, PatternError};
pub use plugin::Plugin;
pub use recording::{HostCall, RecordingHost};
pub use request::{Invocation, InvocationError, RequestError, RequestState};
pub use router::{Context, DispatchError, Route, RouteBuilder, Router};
pub use value::{cast, ParamError, Params};

pub const APP_NAME: &str = "xbmcext";
pub const APP_AUTHOR: &str = "xbmcext";
pub const APP_QUALIFIER: &str = "io";
