//! # luawidget-net
//!
//! Every HTTP request a widget makes goes through a [`NetworkFacade`].
//! In mock mode the facade answers from a [`FixtureSet`]; in real mode it
//! sends the request through an [`HttpExecutor`]. Either way the guest sees
//! the same thing: an asynchronous `(body, status)` pair, with `(nil, 404)`
//! for a fixture miss and `(nil, 0)` for a transport failure.
//!
//! ## Example
//!
//! ```ignore
//! use std::collections::BTreeMap;
//! use std::time::{Duration, Instant};
//! use luawidget_net::{FacadeConfig, FixtureSet, Method, NetworkFacade};
//!
//! let fixtures = FixtureSet::from_json_str(r#"{"/status": "up"}"#)?;
//! let mut net = NetworkFacade::new(FacadeConfig::default(), fixtures);
//! let id = net.issue(Method::GET, "http://nas.local/status", BTreeMap::new(), None);
//!
//! let deadline = Instant::now() + Duration::from_secs(1);
//! let done = net.next_completion(&|candidate| candidate == id, deadline).unwrap();
//! assert_eq!(done.outcome.body(), Some("up"));
//! ```

pub mod error;
pub mod executor;
pub mod facade;
pub mod fixtures;
pub mod types;

pub use error::{NetError, Result, TransportError, TransportErrorKind};
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use facade::{
    merge_headers, Completion, Diagnostic, FacadeConfig, Mode, NetworkFacade, Outcome,
    RecordedRequest, RequestId,
};
pub use fixtures::{strip_credentials, FixtureMatch, FixtureSet, MatchKind, MockFixture};
pub use types::{HttpRequest, HttpResponse, Method};

#[cfg(any(test, feature = "test-utils"))]
pub use executor::mock::MockExecutor;
