//! Mode-driven wrapper around CI scripts.
//!
//! An invocation resolves a [`mode::Mode`] for the wrapped script from the
//! environment, lets hooks act on it before and after the script, and reports
//! a single exit status. Hooks run either in-process or as isolated child
//! processes talking back through [`contract`] lines.

pub mod action;
pub mod config;
pub mod context;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod hook;
pub mod mode;
pub mod resolver;
pub mod watcher;
