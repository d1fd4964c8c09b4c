//! Ariadne Language Server
//!
//! Connects static-analysis engines to editors over the Language Server
//! Protocol: diagnostics with dependency-slice cross references, hovers,
//! go-to-definition, references, document symbols, code lenses and
//! quick fixes, all answered from the facts of the last analysis run.
//!
//! A host registers one [`AnalysisEngine`](ariadne_core::AnalysisEngine)
//! per language id and hands the [`Server`] to [`run_stdio`] or [`serve`].

pub mod analysis;
pub mod code_actions;
pub mod code_lens;
pub mod commands;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod facts;
pub mod goto_definition;
pub mod hover;
pub mod logging;
pub mod server;
pub mod symbols;

pub use analysis::LanguageState;
pub use commands::{CommandOutcome, ServerCommand};
pub use config::{ClientOptions, ServerConfig};
pub use dispatch::{run_stdio, serve, server_capabilities};
pub use error::{CommandError, ConfigError, ServerError};
pub use logging::init_logging;
pub use server::{DocumentEvents, QueryMethods, Server, WorkspaceEvents};
