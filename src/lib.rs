#![doc(html_root_url = "https://docs.rs/vdom-reconcile/0.0.1")]
#![warn(clippy::pedantic)]
//! A keyed virtual DOM reconciler.
//!
//! A [`Patcher`] compares a freshly built [`TreeNode`] tree with the one it returned for the previous update
//! and applies the difference to a live host tree through a [`HostTree`] adapter.
//! Host nodes of elements that stay [`same_node`] are kept, which preserves focus, animations and measurements.
//!
//! Anything that isn't structure (attributes, classes, styles, event listeners…) is left to [`Module`]s,
//! which observe the reconciliation without it depending on them.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod diff;
mod error;
mod hooks;
pub mod host;
pub mod load;
mod node;
pub mod selector;
pub mod web;

pub use diff::{init, Patcher, Root};
pub use error::Error;
pub use hooks::{Completion, Hooks, InitCallback, Module, NodeCallback, PairCallback, PhaseCallback, RemoveCallback};
pub use host::HostTree;
pub use node::{same_node, Config, Content, Key, TreeNode, COMMENT};
