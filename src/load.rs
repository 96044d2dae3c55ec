//! Adopting live host nodes as previously rendered trees.

use crate::{HostTree, TreeNode};
use tracing::{instrument, trace};

/// Wraps a live host element in an otherwise empty [`TreeNode`], as if it had been rendered before.
///
/// The selector is rebuilt from the element's lower-cased tag name and its `id` and `class` attributes,
/// so a new tree with a matching root selector patches into `element` instead of replacing it.
/// Existing children of `element` are not adopted.
#[instrument(skip(host, element))]
pub fn load_element<H: HostTree>(host: &H, element: H::Node) -> TreeNode<H::Node> {
	let mut selector = host.tag_name(&element).to_lowercase();

	if let Some(id) = host.get_attribute(&element, "id").filter(|id| !id.is_empty()) {
		selector.push('#');
		selector.push_str(&id);
	}

	if let Some(class) = host.get_attribute(&element, "class").filter(|class| !class.is_empty()) {
		for class in class.split(' ') {
			selector.push('.');
			selector.push_str(class);
		}
	}

	trace!("Adopted host element as <{}>.", selector);
	let mut node = TreeNode::element(selector).with_children(Vec::new());
	node.host = Some(element);
	node
}
