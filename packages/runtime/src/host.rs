//! Host-side state shared between a runtime and its capability functions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use luawidget_bridge::{CallbackHandle, CallbackRegistry};
use luawidget_kv_store::{InMemoryStore, KvStore};
use luawidget_net::{FacadeConfig, FixtureSet, NetworkFacade, RequestId};

/// Services that outlive any one guest runtime.
///
/// A session reloading its script builds a new runtime on the same
/// services, so storage, network mode and global headers carry over.
#[derive(Clone)]
pub struct HostServices {
    pub network: Rc<RefCell<NetworkFacade>>,
    pub storage: Rc<RefCell<dyn KvStore>>,
    /// Directory the `files` capability is confined to. `None` disables it.
    pub files_root: Option<PathBuf>,
}

impl HostServices {
    pub fn new(network: NetworkFacade, storage: impl KvStore + 'static) -> Self {
        Self {
            network: Rc::new(RefCell::new(network)),
            storage: Rc::new(RefCell::new(storage)),
            files_root: None,
        }
    }

    /// Mock network with no fixtures and throwaway storage.
    pub fn in_memory() -> Self {
        Self::new(
            NetworkFacade::new(FacadeConfig::default(), FixtureSet::new()),
            InMemoryStore::new(),
        )
    }

    pub fn with_files_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.files_root = Some(root.into());
        self
    }
}

/// What the guest has put on screen, plus side effects a real launcher
/// would show outside the widget body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    /// The single output buffer; each `show_*` call replaces it.
    pub output: String,
    pub title: Option<String>,
    /// Labels from the last `show_buttons`, clickable by 1-based index.
    pub buttons: Vec<String>,
    /// Labels of a context menu awaiting a selection.
    pub menu: Option<Vec<String>>,
    pub toasts: Vec<String>,
    pub opened_urls: Vec<String>,
}

impl Surface {
    /// Replace the output buffer with non-button content.
    pub(crate) fn show(&mut self, output: String) {
        self.output = output;
        self.buttons.clear();
    }
}

/// Where a network result goes once it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// An explicit completion callback, released after one call.
    Callback(CallbackHandle),
    /// A global entry point: `on_network_result_<id>` when an id was
    /// given, `on_network_result` otherwise.
    Entry { id: Option<String> },
}

/// Per-runtime state reachable from every capability function.
pub struct GuestState {
    pub chunk: String,
    pub services: HostServices,
    pub surface: RefCell<Surface>,
    pub callbacks: CallbackRegistry,
    pub pending: RefCell<BTreeMap<RequestId, Continuation>>,
}

impl GuestState {
    pub fn new(chunk: impl Into<String>, services: HostServices) -> Self {
        Self {
            chunk: chunk.into(),
            services,
            surface: RefCell::new(Surface::default()),
            callbacks: CallbackRegistry::new(),
            pending: RefCell::new(BTreeMap::new()),
        }
    }
}
