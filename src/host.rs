//! The host-tree adapter, the reconciler's only dependency on the rendering surface.

use crate::Config;
use core::fmt::Debug;

/// A tree-shaped rendering surface the reconciler can mutate.
///
/// All methods take `&self`. Implementations use interior mutability or, like the browser DOM, handles to shared state.
/// The reconciler assumes exclusive access to the affected subtree for the duration of a patch.
///
/// Any [`Self::Error`] returned here aborts the current patch and is handed to its caller,
/// except during asynchronous removal, where failures are logged instead.
pub trait HostTree: 'static {
	/// A cheap handle to one host node.
	type Node: Clone + Debug + 'static;
	type Error: std::error::Error + 'static;

	fn create_element(&self, tag: &str, config: Option<&Config<Self::Node>>) -> Result<Self::Node, Self::Error>;
	fn create_element_ns(&self, namespace: &str, tag: &str, config: Option<&Config<Self::Node>>) -> Result<Self::Node, Self::Error>;
	fn create_text_node(&self, text: &str) -> Result<Self::Node, Self::Error>;
	fn create_comment(&self, text: &str) -> Result<Self::Node, Self::Error>;

	/// Inserts (or moves) `node` before `reference`, or at the end of `parent` for [`None`].
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Self::Error>;
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;
	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn tag_name(&self, element: &Self::Node) -> String;

	/// Replaces all children of an element with `text`, or the data of a text or comment node.
	fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), Self::Error>;

	/// Used for the structural `id` and `class` attributes taken from selectors.
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;
	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
}
