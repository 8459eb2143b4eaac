//! Editor core for the scrapbook notebook app.
//!
//! This crate owns the interactive state of one open page: the live element
//! collection, undo/redo history, debounced auto-save with retry and an
//! offline fallback, multi-selection, and the mapping between the canvas
//! library's pixel-space objects and the millimeter-space records the server
//! stores. It does not render anything; the host drives it with canvas
//! objects and user actions, and supplies the save backend, fallback store
//! and notification sink.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | [`session::EditorSession`], one per open page |
//! | [`history`] | Snapshot-based undo/redo stacks |
//! | [`autosave`] | Debounced save with retry, backoff and status |
//! | [`serialize`] | Canvas object <-> page element conversion (px/mm) |
//! | [`store`] | Shared live element collection |
//! | [`selection`] | Multi-selection set |
//! | [`element`] | Persisted element records and snapshots |
//! | [`fallback`] | Local storage for edits the server did not accept |
//! | [`http`] | reqwest save backend for the REST API |
//! | [`notify`] | User-visible notification sink |
//! | [`config`] | Environment-driven tuning knobs |

pub mod autosave;
pub mod config;
pub mod element;
pub mod fallback;
pub mod history;
pub mod http;
pub mod notify;
pub mod selection;
pub mod serialize;
pub mod session;
pub mod store;
