use crate::hooks::Hooks;
use core::{
	any::{Any, TypeId},
	fmt,
};
use hashbrown::HashMap;
use std::rc::Rc;

/// The selector that marks a [`TreeNode`] as a comment.
pub const COMMENT: &str = "!";

/// Identity token of a [`TreeNode`] among its siblings.
///
/// Keys only take part in list reconciliation. They should be unique among the siblings that declare one,
/// but this is not validated: If an old child sequence contains duplicates, only the last of them can be found by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}

impl From<i64> for Key {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for Key {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u32> for Key {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Self::Str(value.into())
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Self::Str(value.into())
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Int(value) => write!(f, "{}", value),
			Key::Str(value) => write!(f, "{:?}", value),
		}
	}
}

/// What a [`TreeNode`] contains. Child nodes and text are mutually exclusive.
#[derive(Debug)]
pub enum Content<N> {
	Empty,
	Children(Vec<TreeNode<N>>),
	Text(String),
}

impl<N> Default for Content<N> {
	fn default() -> Self {
		Self::Empty
	}
}

/// Opaque per-node data.
///
/// Aside from the element namespace and the per-node [`Hooks`], the reconciler doesn't look into this.
/// Modules store their own data (attributes, classes, styles, listeners…) as typed extensions.
pub struct Config<N> {
	pub namespace: Option<String>,
	pub hooks: Hooks<N>,
	extensions: HashMap<TypeId, Box<dyn Any>>,
}

impl<N> Default for Config<N> {
	fn default() -> Self {
		Self {
			namespace: None,
			hooks: Hooks::default(),
			extensions: HashMap::new(),
		}
	}
}

impl<N> Config<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	#[must_use]
	pub fn with_hooks(mut self, hooks: Hooks<N>) -> Self {
		self.hooks = hooks;
		self
	}

	#[must_use]
	pub fn with<T: Any>(mut self, extension: T) -> Self {
		self.insert(extension);
		self
	}

	/// Stores `extension`, returning the previous value of the same type, if any.
	pub fn insert<T: Any>(&mut self, extension: T) -> Option<T> {
		self.extensions
			.insert(TypeId::of::<T>(), Box::new(extension))
			.and_then(|previous| previous.downcast().ok())
			.map(|previous| *previous)
	}

	#[must_use]
	pub fn get<T: Any>(&self) -> Option<&T> {
		self.extensions.get(&TypeId::of::<T>()).and_then(|extension| extension.downcast_ref())
	}

	pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
		self.extensions.get_mut(&TypeId::of::<T>()).and_then(|extension| extension.downcast_mut())
	}

	pub fn remove<T: Any>(&mut self) -> Option<T> {
		self.extensions
			.remove(&TypeId::of::<T>())
			.and_then(|extension| extension.downcast().ok())
			.map(|extension| *extension)
	}
}

impl<N> fmt::Debug for Config<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("namespace", &self.namespace)
			.field("hooks", &self.hooks)
			.field("extensions", &self.extensions.len())
			.finish()
	}
}

/// Immutable-in-intent description of one element, text run or comment.
///
/// A fresh tree is produced for each update and handed to [`Patcher::patch`](`crate::Patcher::patch`),
/// which binds each node to its host node and returns the tree to be kept as the "current" one for the next update.
#[derive(Debug)]
pub struct TreeNode<N> {
	/// Tag plus literal `#id` and `.class` fragments, or [`COMMENT`]. [`None`] for plain text.
	pub selector: Option<String>,
	pub key: Option<Key>,
	/// Takes part in identity alongside `selector` and `key`.
	pub tag_override: Option<String>,
	pub config: Option<Config<N>>,
	pub content: Content<N>,
	pub(crate) host: Option<N>,
}

impl<N> TreeNode<N> {
	#[must_use]
	pub fn element(selector: impl Into<String>) -> Self {
		Self {
			selector: Some(selector.into()),
			key: None,
			tag_override: None,
			config: Some(Config::new()),
			content: Content::Empty,
			host: None,
		}
	}

	#[must_use]
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			selector: None,
			key: None,
			tag_override: None,
			config: None,
			content: Content::Text(text.into()),
			host: None,
		}
	}

	#[must_use]
	pub fn comment(text: impl Into<String>) -> Self {
		Self {
			content: Content::Text(text.into()),
			..Self::element(COMMENT)
		}
	}

	/// The "old" side handed to `create` callbacks.
	pub(crate) fn empty() -> Self {
		Self {
			content: Content::Children(Vec::new()),
			..Self::element("")
		}
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn with_tag_override(mut self, tag_override: impl Into<String>) -> Self {
		self.tag_override = Some(tag_override.into());
		self
	}

	#[must_use]
	pub fn with_config(mut self, config: Config<N>) -> Self {
		self.config = Some(config);
		self
	}

	#[must_use]
	pub fn with_hooks(mut self, hooks: Hooks<N>) -> Self {
		self.config.get_or_insert_with(Config::new).hooks = hooks;
		self
	}

	#[must_use]
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.config.get_or_insert_with(Config::new).namespace = Some(namespace.into());
		self
	}

	#[must_use]
	pub fn with_extension<T: Any>(mut self, extension: T) -> Self {
		self.config.get_or_insert_with(Config::new).insert(extension);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: impl IntoIterator<Item = TreeNode<N>>) -> Self {
		self.content = Content::Children(children.into_iter().collect());
		self
	}

	#[must_use]
	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.content = Content::Text(text.into());
		self
	}

	/// The host node this node is bound to, once materialized.
	#[must_use]
	pub fn host(&self) -> Option<&N> {
		self.host.as_ref()
	}

	#[must_use]
	pub fn children(&self) -> Option<&[TreeNode<N>]> {
		match &self.content {
			Content::Children(children) => Some(children),
			Content::Empty | Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn text_content(&self) -> Option<&str> {
		match &self.content {
			Content::Text(text) => Some(text),
			Content::Empty | Content::Children(_) => None,
		}
	}

	#[must_use]
	pub fn hooks(&self) -> Option<&Hooks<N>> {
		self.config.as_ref().map(|config| &config.hooks)
	}

	#[must_use]
	pub fn is_comment(&self) -> bool {
		self.selector.as_deref() == Some(COMMENT)
	}

	/// Follows `path` (child indices) down from this node.
	#[must_use]
	pub fn descendant(&self, path: &[usize]) -> Option<&Self> {
		path.iter().try_fold(self, |node, &index| node.children()?.get(index))
	}

	pub(crate) fn describe(&self) -> String {
		match (&self.selector, &self.key) {
			(Some(selector), Some(key)) => format!("<{}> (key {})", selector, key),
			(Some(selector), None) => format!("<{}>", selector),
			(None, _) => "text node".to_owned(),
		}
	}
}

/// Whether `a` and `b` denote the same logical element across renders.
///
/// Only the selector, key and tag override are compared. Nodes for which this holds are always patched into each other,
/// no matter how different their content is.
#[must_use]
pub fn same_node<N>(a: &TreeNode<N>, b: &TreeNode<N>) -> bool {
	a.selector == b.selector && a.key == b.key && a.tag_override == b.tag_override
}
