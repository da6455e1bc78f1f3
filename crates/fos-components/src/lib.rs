//! fOS Components
//!
//! Dynamic custom element loader. Placeholders name a component source by
//! attribute; the loader fetches and parses the source once, defines the
//! tag, and runs each instance through its lifecycle: populate or hydrate,
//! style, run behaviour, activate reactivity, announce readiness and tear
//! down on disconnection.
//!
//! # Features
//! - `quickjs` (default): QuickJS-backed script host used unless another
//!   host is supplied
//!
//! # Example
//! ```rust,ignore
//! use fos_components::Components;
//! use fos_net::FileFetcher;
//!
//! let document = Rc::new(RefCell::new(fos_html::parse(page)));
//! let components = Components::builder(document, Rc::new(FileFetcher::new("site")))
//!     .signal_runtime()
//!     .build();
//! components.start();
//! components.block_until_settled();
//! ```

mod components;
mod config;
mod definition;
mod discovery;
mod error;
pub mod events;
mod fallback;
mod instance;
mod loader;
mod parser;
mod props;
mod registry;
mod scripts;
mod styles;

pub use components::{Components, ComponentsBuilder};
pub use config::Config;
pub use definition::{ComponentDefinition, Isolation, StyleNode};
pub use error::ComponentError;
pub use fallback::generic_content;
pub use instance::{ComponentInstance, InstanceState};
pub use loader::{ReadyHook, CONTENT_READY_ACTION};
pub use parser::parse_component;
