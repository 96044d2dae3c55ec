//! [`HostTree`] for the browser DOM through [`web_sys`].

use crate::{Config, HostTree};
use thiserror::Error;
use tracing::{instrument, trace};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

/// A failed DOM call, with the message of the thrown JavaScript value.
#[derive(Debug, Error)]
#[error("DOM operation failed: {message}")]
pub struct JsError {
	message: String,
}

impl JsError {
	#[must_use]
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<JsValue> for JsError {
	fn from(value: JsValue) -> Self {
		let message = match value.dyn_ref::<js_sys::Error>() {
			Some(error) => error.message().into(),
			None => value.as_string().unwrap_or_else(|| format!("{:?}", value)),
		};
		Self { message }
	}
}

/// Creates nodes with one [`Document`] and mutates them in place.
#[derive(Debug, Clone)]
pub struct DomHost {
	document: Document,
}

impl DomHost {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	/// Uses the document of the global `window`, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

fn element(node: &Node) -> Result<&Element, JsError> {
	node.dyn_ref::<Element>().ok_or_else(|| JsError {
		message: format!("expected an element but found a {} node", node.node_name()),
	})
}

impl HostTree for DomHost {
	type Node = Node;
	type Error = JsError;

	#[instrument(skip(self, _config))]
	fn create_element(&self, tag: &str, _config: Option<&Config<Node>>) -> Result<Node, JsError> {
		Ok(self.document.create_element(tag)?.into())
	}

	#[instrument(skip(self, _config))]
	fn create_element_ns(&self, namespace: &str, tag: &str, _config: Option<&Config<Node>>) -> Result<Node, JsError> {
		Ok(self.document.create_element_ns(Some(namespace), tag)?.into())
	}

	fn create_text_node(&self, text: &str) -> Result<Node, JsError> {
		Ok(self.document.create_text_node(text).into())
	}

	fn create_comment(&self, text: &str) -> Result<Node, JsError> {
		Ok(self.document.create_comment(text).into())
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) -> Result<(), JsError> {
		parent.insert_before(node, reference)?;
		Ok(())
	}

	fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), JsError> {
		parent.remove_child(child)?;
		Ok(())
	}

	fn append_child(&self, parent: &Node, child: &Node) -> Result<(), JsError> {
		parent.append_child(child)?;
		Ok(())
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn tag_name(&self, element: &Node) -> String {
		element.dyn_ref::<Element>().map(Element::tag_name).unwrap_or_default()
	}

	fn set_text_content(&self, node: &Node, text: &str) -> Result<(), JsError> {
		node.set_text_content(Some(text));
		Ok(())
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), JsError> {
		trace!(attribute = name, "Setting structural attribute.");
		element(node)?.set_attribute(name, value)?;
		Ok(())
	}

	fn get_attribute(&self, node: &Node, name: &str) -> Option<String> {
		node.dyn_ref::<Element>()?.get_attribute(name)
	}
}
