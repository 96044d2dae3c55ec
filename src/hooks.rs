use crate::TreeNode;
use core::{cell::Cell, fmt};
use std::{borrow::Cow, rc::Rc};
use tracing::warn;

pub type PhaseCallback = Rc<dyn Fn()>;
pub type InitCallback<N> = Rc<dyn Fn(&mut TreeNode<N>)>;
pub type NodeCallback<N> = Rc<dyn Fn(&TreeNode<N>)>;
/// Receives `(old, new)`, or `(empty, new)` during creation.
pub type PairCallback<N> = Rc<dyn Fn(&TreeNode<N>, &TreeNode<N>)>;
pub type RemoveCallback<N> = Rc<dyn Fn(&TreeNode<N>, Completion)>;

/// Callbacks attached to one specific [`TreeNode`] through its [`Config`](`crate::Config`).
pub struct Hooks<N> {
	pub(crate) init: Option<InitCallback<N>>,
	pub(crate) create: Option<PairCallback<N>>,
	pub(crate) insert: Option<NodeCallback<N>>,
	pub(crate) prepatch: Option<PairCallback<N>>,
	pub(crate) update: Option<PairCallback<N>>,
	pub(crate) postpatch: Option<PairCallback<N>>,
	pub(crate) destroy: Option<NodeCallback<N>>,
	pub(crate) remove: Option<RemoveCallback<N>>,
}

impl<N> Default for Hooks<N> {
	fn default() -> Self {
		Self {
			init: None,
			create: None,
			insert: None,
			prepatch: None,
			update: None,
			postpatch: None,
			destroy: None,
			remove: None,
		}
	}
}

impl<N> Hooks<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs before the node is materialized and may rewrite it.
	#[must_use]
	pub fn on_init(mut self, init: impl Fn(&mut TreeNode<N>) + 'static) -> Self {
		self.init = Some(Rc::new(init));
		self
	}

	#[must_use]
	pub fn on_create(mut self, create: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.create = Some(Rc::new(create));
		self
	}

	/// Deferred until the whole patch has been applied, so the host node is attached by then.
	#[must_use]
	pub fn on_insert(mut self, insert: impl Fn(&TreeNode<N>) + 'static) -> Self {
		self.insert = Some(Rc::new(insert));
		self
	}

	#[must_use]
	pub fn on_prepatch(mut self, prepatch: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.prepatch = Some(Rc::new(prepatch));
		self
	}

	#[must_use]
	pub fn on_update(mut self, update: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.update = Some(Rc::new(update));
		self
	}

	/// Runs after all structural work on the node. The old node's child list has been consumed by then.
	#[must_use]
	pub fn on_postpatch(mut self, postpatch: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.postpatch = Some(Rc::new(postpatch));
		self
	}

	#[must_use]
	pub fn on_destroy(mut self, destroy: impl Fn(&TreeNode<N>) + 'static) -> Self {
		self.destroy = Some(Rc::new(destroy));
		self
	}

	/// The host node is detached only once `remove` (and every module remove observer) has signalled the [`Completion`].
	#[must_use]
	pub fn on_remove(mut self, remove: impl Fn(&TreeNode<N>, Completion) + 'static) -> Self {
		self.remove = Some(Rc::new(remove));
		self
	}
}

impl<N> fmt::Debug for Hooks<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut set = f.debug_set();
		for (name, present) in [
			("init", self.init.is_some()),
			("create", self.create.is_some()),
			("insert", self.insert.is_some()),
			("prepatch", self.prepatch.is_some()),
			("update", self.update.is_some()),
			("postpatch", self.postpatch.is_some()),
			("destroy", self.destroy.is_some()),
			("remove", self.remove.is_some()),
		] {
			if present {
				set.entry(&name);
			}
		}
		set.finish()
	}
}

/// A cross-cutting observer of the reconciler, registered once with [`Patcher::new`](`crate::Patcher::new`).
///
/// Every phase is optional. Modules only see transitions; they never drive the diff.
pub struct Module<N> {
	name: Cow<'static, str>,
	pre: Option<PhaseCallback>,
	create: Option<PairCallback<N>>,
	update: Option<PairCallback<N>>,
	destroy: Option<NodeCallback<N>>,
	remove: Option<RemoveCallback<N>>,
	post: Option<PhaseCallback>,
}

impl<N> Module<N> {
	#[must_use]
	pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
		Self {
			name: name.into(),
			pre: None,
			create: None,
			update: None,
			destroy: None,
			remove: None,
			post: None,
		}
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Runs at the start of each patch.
	#[must_use]
	pub fn on_pre(mut self, pre: impl Fn() + 'static) -> Self {
		self.pre = Some(Rc::new(pre));
		self
	}

	#[must_use]
	pub fn on_create(mut self, create: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.create = Some(Rc::new(create));
		self
	}

	#[must_use]
	pub fn on_update(mut self, update: impl Fn(&TreeNode<N>, &TreeNode<N>) + 'static) -> Self {
		self.update = Some(Rc::new(update));
		self
	}

	#[must_use]
	pub fn on_destroy(mut self, destroy: impl Fn(&TreeNode<N>) + 'static) -> Self {
		self.destroy = Some(Rc::new(destroy));
		self
	}

	#[must_use]
	pub fn on_remove(mut self, remove: impl Fn(&TreeNode<N>, Completion) + 'static) -> Self {
		self.remove = Some(Rc::new(remove));
		self
	}

	/// Runs at the end of each patch, after deferred insert hooks.
	#[must_use]
	pub fn on_post(mut self, post: impl Fn() + 'static) -> Self {
		self.post = Some(Rc::new(post));
		self
	}
}

impl<N> fmt::Debug for Module<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Module").field(&self.name).finish()
	}
}

/// Per-phase module callbacks, in registration order. Fixed for the lifetime of a [`Patcher`](`crate::Patcher`).
pub(crate) struct Callbacks<N> {
	pub pre: Vec<PhaseCallback>,
	pub create: Vec<PairCallback<N>>,
	pub update: Vec<PairCallback<N>>,
	pub destroy: Vec<NodeCallback<N>>,
	pub remove: Vec<RemoveCallback<N>>,
	pub post: Vec<PhaseCallback>,
}

impl<N> Callbacks<N> {
	pub fn collect(modules: &[Module<N>]) -> Self {
		let mut callbacks = Self {
			pre: Vec::new(),
			create: Vec::new(),
			update: Vec::new(),
			destroy: Vec::new(),
			remove: Vec::new(),
			post: Vec::new(),
		};
		for module in modules {
			callbacks.pre.extend(module.pre.clone());
			callbacks.create.extend(module.create.clone());
			callbacks.update.extend(module.update.clone());
			callbacks.destroy.extend(module.destroy.clone());
			callbacks.remove.extend(module.remove.clone());
			callbacks.post.extend(module.post.clone());
		}
		callbacks
	}
}

/// Shared completion signal for the asynchronous removal of one host node.
///
/// Each remove observer receives a clone and calls [`Completion::done`] when it is finished with the node,
/// in any order and at any time. The host node is detached exactly once, when the last outstanding signal arrives.
/// An observer that never signals keeps the node attached indefinitely.
#[derive(Clone)]
pub struct Completion {
	remaining: Rc<Cell<usize>>,
	detach: Rc<dyn Fn()>,
}

impl Completion {
	pub(crate) fn new(listeners: usize, detach: impl Fn() + 'static) -> Self {
		Self {
			remaining: Rc::new(Cell::new(listeners)),
			detach: Rc::new(detach),
		}
	}

	pub fn done(&self) {
		match self.remaining.get() {
			0 => warn!("Removal completion signalled after the node was already detached. Ignoring."),
			1 => {
				self.remaining.set(0);
				(self.detach)();
			}
			remaining => self.remaining.set(remaining - 1),
		}
	}

	/// How many signals are still outstanding before the host node is detached.
	#[must_use]
	pub fn remaining(&self) -> usize {
		self.remaining.get()
	}
}

impl fmt::Debug for Completion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Completion").field("remaining", &self.remaining.get()).finish()
	}
}
