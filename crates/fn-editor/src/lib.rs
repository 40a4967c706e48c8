pub mod context;
pub mod error;
pub mod overlay;
pub mod pending;
pub mod proxy;
pub mod session;
pub mod store;

pub use context::{ContextChange, ContextWatcher, DiagramContext, SignalSource, WatcherConfig};
pub use error::RemoteError;
pub use overlay::{AnchorWrite, DrawOutcome, Overlay, OverlayKind, OverlayManager};
pub use pending::{OpKind, OpTracker, Ticket};
pub use proxy::{Method, Proxy, ProxyRequest, ProxyResponse};
pub use session::{DrawClick, Interaction, InteractionSession};
pub use store::{FieldCaps, NoteStore, StoreConfig, WriteKind, escape_soql};
