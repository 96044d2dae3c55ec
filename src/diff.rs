use crate::{
	hooks::{Callbacks, Completion},
	load::load_element,
	node::{same_node, Content, Key, TreeNode},
	selector::Selector,
	Error, HostTree, Module,
};
use core::{cell::RefCell, fmt, iter, mem, ops::Range};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

type Node<H> = TreeNode<<H as HostTree>::Node>;

/// How many parsed selectors a [`Patcher`] keeps. The cache is cleared once it is full.
pub const SELECTOR_CACHE_CAPACITY: usize = 256;
type Result<T, H> = core::result::Result<T, Error<<H as HostTree>::Error>>;

/// The previous render passed to [`Patcher::patch`].
pub enum Root<N> {
	/// A live host element that was never patched before, e.g. a server-rendered container.
	/// It is adopted through [`load_element`].
	Host(N),
	/// The tree returned by the previous patch.
	Tree(TreeNode<N>),
}

impl<N> From<TreeNode<N>> for Root<N> {
	fn from(tree: TreeNode<N>) -> Self {
		Self::Tree(tree)
	}
}

/// Creates a [`Patcher`] that notifies `modules` (in order) and mutates the host tree through `host`.
pub fn init<H: HostTree>(modules: impl IntoIterator<Item = Module<H::Node>>, host: H) -> Patcher<H> {
	Patcher::new(modules, host)
}

/// Reconciles successive tree descriptions against one host tree.
///
/// # Correct Use
///
/// Each call to [`Patcher::patch`] consumes the previous tree and returns the new one, which is the only handle
/// that may be submitted as "old" for the next update. Don't patch the same root again from inside one of its hooks.
/// Patching independent roots from inside hooks is fine.
pub struct Patcher<H: HostTree> {
	host: Rc<H>,
	callbacks: Callbacks<H::Node>,
	module_names: Vec<String>,
	empty: Node<H>,
	selectors: RefCell<HashMap<String, Rc<Selector>>>,
}

impl<H: HostTree> fmt::Debug for Patcher<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Patcher")
			.field("modules", &self.module_names)
			.field("cached_selectors", &self.selectors.borrow().len())
			.finish_non_exhaustive()
	}
}

impl<H: HostTree> Patcher<H> {
	#[must_use]
	pub fn new(modules: impl IntoIterator<Item = Module<H::Node>>, host: H) -> Self {
		let modules = modules.into_iter().collect::<Vec<_>>();
		let module_names = modules.iter().map(|module| module.name().to_owned()).collect::<Vec<_>>();
		debug!(modules = ?module_names, "Registering modules.");
		Self {
			host: Rc::new(host),
			callbacks: Callbacks::collect(&modules),
			module_names,
			empty: TreeNode::empty(),
			selectors: RefCell::default(),
		}
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	/// Transforms the host tree from `old` to `new` and returns `new`, now bound to its host nodes.
	///
	/// If the roots are not [`same_node`], `new` is built from scratch and inserted next to the old root,
	/// which is removed afterwards.
	///
	/// # Errors
	///
	/// Host failures are returned as they happen. The host tree is left partially updated in that case.
	///
	/// [`Error::Unbound`] is returned if `old` contains a node that was never materialized.
	#[instrument(skip(self, old, new), fields(modules = self.module_names.len()))]
	pub fn patch(&self, old: impl Into<Root<H::Node>>, mut new: Node<H>) -> Result<Node<H>, H> {
		for pre in &self.callbacks.pre {
			pre();
		}

		let old = match old.into() {
			Root::Host(element) => load_element(&*self.host, element),
			Root::Tree(tree) => tree,
		};

		let mut pass = Pass::new(self);
		if same_node(&old, &new) {
			pass.patch_node(old, &mut new)?;
		} else {
			pass.replace_root(old, &mut new)?;
		}

		trace!("Firing {} deferred insert hook(s).", pass.inserted.len());
		for path in &pass.inserted {
			match new.descendant(path) {
				Some(node) => {
					if let Some(insert) = node.hooks().and_then(|hooks| hooks.insert.as_ref()) {
						insert(node);
					}
				}
				None => error!(?path, "A created node with an insert hook is no longer part of the new tree. Skipping its hook."),
			}
		}

		for post in &self.callbacks.post {
			post();
		}
		Ok(new)
	}

	/// Patches `current` into itself.
	///
	/// This is the "nothing changed" case: pre, prepatch and post callbacks run, the host tree is left alone.
	#[instrument(skip(self, current))]
	pub fn refresh(&self, current: Node<H>) -> Node<H> {
		for pre in &self.callbacks.pre {
			pre();
		}
		if let Some(prepatch) = current.hooks().and_then(|hooks| hooks.prepatch.as_ref()) {
			prepatch(&current, &current);
		}
		for post in &self.callbacks.post {
			post();
		}
		current
	}

	/// How many distinct selectors are currently cached. Never more than [`SELECTOR_CACHE_CAPACITY`].
	#[must_use]
	pub fn cached_selectors(&self) -> usize {
		self.selectors.borrow().len()
	}

	fn selector(&self, selector: &str) -> Rc<Selector> {
		let mut selectors = self.selectors.borrow_mut();
		if let Some(parsed) = selectors.get(selector) {
			return Rc::clone(parsed);
		}
		let parsed = Rc::new(Selector::parse(selector));
		if selectors.len() >= SELECTOR_CACHE_CAPACITY {
			trace!("Selector cache full. Clearing it.");
			selectors.clear();
		}
		selectors.insert(selector.to_owned(), Rc::clone(&parsed));
		parsed
	}
}

/// State of one [`Patcher::patch`] call.
struct Pass<'p, H: HostTree> {
	patcher: &'p Patcher<H>,
	/// Paths (in the new tree) of created nodes with an insert hook, in creation order.
	inserted: Vec<Vec<usize>>,
	/// Path of the new node currently being created or patched.
	path: Vec<usize>,
}

impl<'p, H: HostTree> Pass<'p, H> {
	fn new(patcher: &'p Patcher<H>) -> Self {
		Self {
			patcher,
			inserted: Vec::new(),
			path: Vec::new(),
		}
	}

	fn bound<'a>(&self, node: &'a Node<H>) -> Result<&'a H::Node, H> {
		node.host.as_ref().ok_or_else(|| {
			if cfg!(feature = "log-paths") {
				error!(path = ?self.path, "{} is not bound to a host node.", node.describe());
			}
			Error::Unbound(node.describe())
		})
	}

	fn at<T>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> T) -> T {
		self.path.push(index);
		let result = f(self);
		self.path.pop();
		result
	}

	fn replace_root(&mut self, old: Node<H>, new: &mut Node<H>) -> Result<(), H> {
		let span = trace_span!("Replacing root", old = %old.describe(), new = %new.describe());
		let _enter = span.enter();

		let patcher = self.patcher;
		let host = &*patcher.host;
		let old_element = self.bound(&old)?.clone();
		let parent = host.parent_node(&old_element);

		let element = self.create_element(new)?;
		match parent {
			Some(parent) => {
				host.insert_before(&parent, &element, host.next_sibling(&old_element).as_ref())?;
				self.remove_nodes(&parent, iter::once(old))
			}
			None => {
				warn!("The previous root has no parent. Leaving the new root detached.");
				Ok(())
			}
		}
	}

	/// Materializes `node` and its descendants. The returned host node is not attached yet.
	#[instrument(skip(self, node), fields(node = %node.describe()))]
	fn create_element(&mut self, node: &mut Node<H>) -> Result<H::Node, H> {
		let patcher = self.patcher;
		let host = &*patcher.host;

		if let Some(init) = node.hooks().and_then(|hooks| hooks.init.clone()) {
			init(node);
		}

		if node.is_comment() {
			if let Content::Empty = node.content {
				node.content = Content::Text(String::new());
			}
			let comment = host.create_comment(node.text_content().unwrap_or_default())?;
			if cfg!(feature = "dangerous-logging") {
				trace!(comment = node.text_content(), "Created comment.");
			}
			node.host = Some(comment.clone());
			return Ok(comment);
		}

		let selector = match node.selector.as_deref() {
			Some(selector) => patcher.selector(selector),
			None => {
				let text = host.create_text_node(node.text_content().unwrap_or_default())?;
				if cfg!(feature = "dangerous-logging") {
					trace!(text = node.text_content(), "Created text node.");
				}
				node.host = Some(text.clone());
				return Ok(text);
			}
		};

		let config = node.config.as_ref();
		let element = match config.and_then(|config| config.namespace.as_deref()) {
			Some(namespace) => host.create_element_ns(namespace, selector.tag(), config)?,
			None => host.create_element(selector.tag(), config)?,
		};
		if let Some(id) = selector.id() {
			host.set_attribute(&element, "id", id)?;
		}
		if let Some(class) = selector.class() {
			host.set_attribute(&element, "class", class)?;
		}
		node.host = Some(element.clone());

		for create in &patcher.callbacks.create {
			create(&patcher.empty, &*node);
		}

		match &mut node.content {
			Content::Children(children) => {
				for (i, child) in children.iter_mut().enumerate() {
					let child = self.at(i, |pass| pass.create_element(child))?;
					host.append_child(&element, &child)?;
				}
			}
			Content::Text(text) => host.append_child(&element, &host.create_text_node(text)?)?,
			Content::Empty => (),
		}

		if let Some(hooks) = node.hooks() {
			if let Some(create) = &hooks.create {
				create(&patcher.empty, &*node);
			}
			if hooks.insert.is_some() {
				self.inserted.push(self.path.clone());
			}
		}

		Ok(element)
	}

	/// Creates `nodes` and inserts them before `before` (or at the end of `parent`).
	/// `offset` is the index of `nodes[0]` among its siblings in the new tree.
	fn add_nodes(&mut self, parent: &H::Node, before: Option<&H::Node>, nodes: &mut [Node<H>], offset: usize) -> Result<(), H> {
		let patcher = self.patcher;
		let host = &*patcher.host;
		for (i, node) in nodes.iter_mut().enumerate() {
			let element = self.at(offset + i, |pass| pass.create_element(node))?;
			host.insert_before(parent, &element, before)?;
		}
		Ok(())
	}

	/// Notifies per-node and module destroy callbacks for `node` and then its descendants.
	fn invoke_destroy(&self, node: &Node<H>) {
		let config = match &node.config {
			Some(config) => config,
			None => return,
		};

		if let Some(destroy) = &config.hooks.destroy {
			destroy(node);
		}
		for destroy in &self.patcher.callbacks.destroy {
			destroy(node);
		}

		for child in node.children().into_iter().flatten() {
			self.invoke_destroy(child);
		}
	}

	/// Tears down `nodes` and removes their host nodes from `parent`,
	/// as soon as all remove observers of each node have signalled completion.
	fn remove_nodes(&mut self, parent: &H::Node, nodes: impl IntoIterator<Item = Node<H>>) -> Result<(), H> {
		let patcher = self.patcher;
		let host = &*patcher.host;

		for node in nodes {
			let element = self.bound(&node)?.clone();

			if node.selector.is_none() {
				trace!("Removing text node.");
				host.remove_child(parent, &element)?;
				continue;
			}

			let span = trace_span!("Removing", node = %node.describe());
			let _enter = span.enter();

			self.invoke_destroy(&node);

			let remove_hook = node.hooks().and_then(|hooks| hooks.remove.clone());
			let listeners = patcher.callbacks.remove.len() + usize::from(remove_hook.is_some());
			if listeners == 0 {
				host.remove_child(parent, &element)?;
				continue;
			}

			trace!("Waiting for {} remove observer(s).", listeners);
			let completion = {
				let host = Rc::clone(&patcher.host);
				Completion::new(listeners, move || match host.parent_node(&element) {
					Some(parent) => {
						if let Err(error) = host.remove_child(&parent, &element) {
							error!("Failed to remove the node: {}", error);
						}
					}
					None => {
						if cfg!(feature = "dangerous-logging") {
							warn!("Node {:?} was detached before its removal completed.", element);
						} else {
							warn!("A node was detached before its removal completed.");
						}
					}
				})
			};
			for remove in &patcher.callbacks.remove {
				remove(&node, completion.clone());
			}
			if let Some(remove) = remove_hook {
				remove(&node, completion);
			}
		}
		Ok(())
	}

	/// Patches `old` into `new`, which must be [`same_node`].
	#[instrument(skip(self, old, new), fields(node = %new.describe()))]
	fn patch_node(&mut self, mut old: Node<H>, new: &mut Node<H>) -> Result<(), H> {
		let patcher = self.patcher;
		let host = &*patcher.host;

		if let Some(prepatch) = new.hooks().and_then(|hooks| hooks.prepatch.as_ref()) {
			prepatch(&old, &*new);
		}

		new.host = old.host.clone();

		if new.config.is_some() {
			for update in &patcher.callbacks.update {
				update(&old, &*new);
			}
			if let Some(update) = new.hooks().and_then(|hooks| hooks.update.as_ref()) {
				update(&old, &*new);
			}
		}

		let element = self.bound(new)?.clone();
		let old_children = match &mut old.content {
			Content::Children(children) => Some(mem::take(children)),
			Content::Empty | Content::Text(_) => None,
		};

		match &mut new.content {
			Content::Children(children) => match old_children {
				Some(old_children) => self.update_children(&element, old_children, children)?,
				None => {
					if old.text_content().is_some() {
						host.set_text_content(&element, "")?;
					}
					self.add_nodes(&element, None, children, 0)?;
				}
			},
			Content::Empty => match old_children {
				Some(old_children) => self.remove_nodes(&element, old_children)?,
				None => {
					if old.text_content().is_some() {
						host.set_text_content(&element, "")?;
					}
				}
			},
			Content::Text(text) => {
				if old.text_content() != Some(text.as_str()) {
					if let Some(old_children) = old_children {
						self.remove_nodes(&element, old_children)?;
					}
					if cfg!(feature = "dangerous-logging") {
						trace!(old = old.text_content(), new = text.as_str(), "Updating text.");
					}
					host.set_text_content(&element, text)?;
				}
			}
		}

		if let Some(postpatch) = new.hooks().and_then(|hooks| hooks.postpatch.as_ref()) {
			postpatch(&old, &*new);
		}
		Ok(())
	}

	fn patch_child(&mut self, old: Node<H>, new: &mut [Node<H>], index: usize) -> Result<(), H> {
		self.at(index, |pass| pass.patch_node(old, &mut new[index]))
	}

	/// Reconciles two sibling sequences with four cursors, falling back to a key lookup.
	///
	/// Host nodes are reused wherever [`same_node`] allows and moved into the new order.
	/// This runs in linear time but doesn't minimize moves.
	#[allow(clippy::too_many_lines)]
	#[instrument(skip(self, parent, old, new), fields(old = old.len(), new = new.len()))]
	fn update_children(&mut self, parent: &H::Node, old: Vec<Node<H>>, new: &mut [Node<H>]) -> Result<(), H> {
		let patcher = self.patcher;
		let host = &*patcher.host;

		// `None` marks a tombstone: an old node that was reused out of order.
		let mut old = old.into_iter().map(Some).collect::<Vec<_>>();
		let (mut old_start, mut old_end) = (0, old.len());
		let (mut new_start, mut new_end) = (0, new.len());
		let mut old_key_to_index = None;

		while old_start < old_end && new_start < new_end {
			if old[old_start].is_none() {
				old_start += 1;
			} else if old[old_end - 1].is_none() {
				old_end -= 1;
			} else if let Some(old_first) = take_if(&mut old[old_start], |node| same_node(node, &new[new_start])) {
				self.patch_child(old_first, new, new_start)?;
				old_start += 1;
				new_start += 1;
			} else if let Some(old_last) = take_if(&mut old[old_end - 1], |node| same_node(node, &new[new_end - 1])) {
				self.patch_child(old_last, new, new_end - 1)?;
				old_end -= 1;
				new_end -= 1;
			} else if let Some(old_first) = take_if(&mut old[old_start], |node| same_node(node, &new[new_end - 1])) {
				let span = trace_span!("Moved right", old = old_start, new = new_end - 1);
				let _enter = span.enter();
				self.patch_child(old_first, new, new_end - 1)?;
				let anchor = host.next_sibling(self.bound_slot(&old[old_end - 1])?);
				host.insert_before(parent, self.bound(&new[new_end - 1])?, anchor.as_ref())?;
				old_start += 1;
				new_end -= 1;
			} else if let Some(old_last) = take_if(&mut old[old_end - 1], |node| same_node(node, &new[new_start])) {
				let span = trace_span!("Moved left", old = old_end - 1, new = new_start);
				let _enter = span.enter();
				self.patch_child(old_last, new, new_start)?;
				let anchor = self.bound_slot(&old[old_start])?;
				host.insert_before(parent, self.bound(&new[new_start])?, Some(anchor))?;
				old_end -= 1;
				new_start += 1;
			} else {
				let old_key_to_index = old_key_to_index.get_or_insert_with(|| key_to_index(&old, old_start..old_end));
				let anchor = self.bound_slot(&old[old_start])?.clone();
				let index_in_old = new[new_start].key.as_ref().and_then(|key| old_key_to_index.get(key)).copied();

				let reused = match index_in_old {
					None => None,
					Some(index) => {
						let selector = &new[new_start].selector;
						let reused = take_if(&mut old[index], |node| &node.selector == selector);
						if reused.is_none() {
							// The stale entry stays in place. Only the cursor scan or the final bulk removal tears it down.
							trace!(index, "Key matched an old node of a different shape or one that was already reused.");
						}
						reused.map(|reused| (index, reused))
					}
				};

				match reused {
					Some((index, old_node)) => {
						let span = trace_span!("Moved by key", old = index, new = new_start);
						let _enter = span.enter();
						self.patch_child(old_node, new, new_start)?;
						if index != old_start {
							host.insert_before(parent, self.bound(&new[new_start])?, Some(&anchor))?;
						}
					}
					None => {
						let span = trace_span!("New element", new = new_start);
						let _enter = span.enter();
						let element = self.at(new_start, |pass| pass.create_element(&mut new[new_start]))?;
						host.insert_before(parent, &element, Some(&anchor))?;
					}
				}
				new_start += 1;
			}
		}

		if old_start >= old_end {
			if new_start < new_end {
				let before = new.get(new_end).map(|node| self.bound(node)).transpose()?.cloned();
				trace!("Adding {} node(s).", new_end - new_start);
				self.add_nodes(parent, before.as_ref(), &mut new[new_start..new_end], new_start)?;
			}
		} else {
			trace!("Removing up to {} node(s).", old_end - old_start);
			self.remove_nodes(parent, old.drain(old_start..old_end).flatten())?;
		}
		Ok(())
	}

	fn bound_slot<'a>(&self, slot: &'a Option<Node<H>>) -> Result<&'a H::Node, H> {
		match slot {
			Some(node) => self.bound(node),
			None => Err(Error::Unbound("tombstone".to_owned())),
		}
	}
}

/// Takes the node out of `slot` (leaving a tombstone) if `predicate` holds for it.
fn take_if<N>(slot: &mut Option<TreeNode<N>>, predicate: impl FnOnce(&TreeNode<N>) -> bool) -> Option<TreeNode<N>> {
	if slot.as_ref().map_or(false, predicate) {
		slot.take()
	} else {
		None
	}
}

/// Maps keys to old indices within `range`. Later duplicates overwrite earlier ones.
fn key_to_index<N>(old: &[Option<TreeNode<N>>], range: Range<usize>) -> HashMap<Key, usize> {
	let mut map = HashMap::new();
	for (index, node) in range.clone().zip(&old[range]) {
		if let Some(key) = node.as_ref().and_then(|node| node.key.as_ref()) {
			if let Some(previous) = map.insert(key.clone(), index) {
				if STATIC_MAX_LEVEL >= Level::WARN {
					warn!("Duplicate key {} among old children (indices {} and {}). Only the latter can be reused by key.", key, previous, index);
				}
			}
		}
	}
	map
}
