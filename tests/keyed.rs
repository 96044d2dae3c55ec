use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use vdom_reconcile::{init, Hooks, Key, Module, TreeNode};

use mock_host_::{hosts, init_logging, mount, MockHost, MockNode, Op};

fn item(key: &str) -> TreeNode<MockNode> {
	TreeNode::element("li").with_key(key).with_text(key)
}

fn list(keys: &[&str]) -> TreeNode<MockNode> {
	TreeNode::element("div").with_children(keys.iter().copied().map(item))
}

fn keys(tree: &TreeNode<MockNode>) -> Vec<String> {
	tree.children()
		.unwrap()
		.iter()
		.map(|child| match &child.key {
			Some(Key::Str(key)) => key.to_string(),
			key => panic!("unexpected key {:?}", key),
		})
		.collect()
}

/// Counts module create and destroy callbacks.
fn counting(created: &Rc<Cell<usize>>, destroyed: &Rc<Cell<usize>>) -> Module<MockNode> {
	let (created, destroyed) = (Rc::clone(created), Rc::clone(destroyed));
	Module::new("counting")
		.on_create(move |_: &TreeNode<MockNode>, _: &TreeNode<MockNode>| created.set(created.get() + 1))
		.on_destroy(move |_: &TreeNode<MockNode>| destroyed.set(destroyed.get() + 1))
}

#[test]
fn reorder_moves_without_recreating() {
	init_logging();
	let host = MockHost::new();
	let (created, destroyed) = <(Rc<Cell<usize>>, Rc<Cell<usize>>)>::default();
	let patcher = init(vec![counting(&created, &destroyed)], host.clone());
	let (body, tree) = mount(&patcher, list(&["a", "b", "c"]));
	let [a, b, c] = match hosts(&tree).as_slice() {
		[a, b, c] => [a.clone(), b.clone(), c.clone()],
		other => panic!("{:?}", other),
	};
	created.set(0);

	let tree = patcher.patch(tree, list(&["c", "a", "b"])).unwrap();

	assert_eq!(hosts(&tree), [c.clone(), a.clone(), b]);
	assert_eq!(host.ops(), [Op::Insert { parent: tree.host().unwrap().id(), node: c.id(), before: Some(a.id()) }]);
	assert_eq!((created.get(), destroyed.get()), (0, 0));
	assert_eq!(body.render(), "<body><div><li>c</li><li>a</li><li>b</li></div></body>");
}

#[test]
fn first_moves_to_the_end() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let (_, tree) = mount(&patcher, list(&["a", "b", "c"]));
	let before = hosts(&tree);

	let tree = patcher.patch(tree, list(&["b", "c", "a"])).unwrap();

	assert_eq!(hosts(&tree), [before[1].clone(), before[2].clone(), before[0].clone()]);
	assert_eq!(host.ops(), [Op::Insert { parent: tree.host().unwrap().id(), node: before[0].id(), before: None }]);
}

#[test]
fn reversal_reuses_every_node() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let (body, tree) = mount(&patcher, list(&["1", "2", "3", "4", "5"]));
	let mut before = hosts(&tree);

	let tree = patcher.patch(tree, list(&["5", "4", "3", "2", "1"])).unwrap();

	before.reverse();
	assert_eq!(hosts(&tree), before);
	assert_eq!(host.created(), 0);
	assert!(host.removed().is_empty());
	assert_eq!(keys(&tree), ["5", "4", "3", "2", "1"]);
	assert_eq!(
		body.render(),
		"<body><div><li>5</li><li>4</li><li>3</li><li>2</li><li>1</li></div></body>"
	);
}

#[test]
fn key_lookup_moves_out_of_order_nodes() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let (body, tree) = mount(&patcher, list(&["a", "b", "c", "d"]));
	let before = hosts(&tree);

	let tree = patcher.patch(tree, list(&["c", "a", "d", "b"])).unwrap();

	assert_eq!(hosts(&tree), [2, 0, 3, 1].map(|i| before[i].clone()));
	assert_eq!(host.created(), 0);
	assert!(host.removed().is_empty());
	assert_eq!(body.render(), "<body><div><li>c</li><li>a</li><li>d</li><li>b</li></div></body>");
}

#[test]
fn pure_insertion_creates_one_node_in_place() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let (body, tree) = mount(&patcher, list(&["a", "b"]));
	let before = hosts(&tree);

	let tree = patcher.patch(tree, list(&["a", "x", "b"])).unwrap();

	let after = hosts(&tree);
	assert_eq!((&after[0], &after[2]), (&before[0], &before[1]));
	let parent = tree.host().unwrap().id();
	// The `<li>` and its text node.
	assert_eq!(host.created(), 2);
	assert!(host.ops().contains(&Op::Insert { parent, node: after[1].id(), before: Some(before[1].id()) }));
	assert!(host.removed().is_empty());
	assert_eq!(body.render(), "<body><div><li>a</li><li>x</li><li>b</li></div></body>");
}

#[test]
fn pure_removal_destroys_while_attached() {
	init_logging();
	let host = MockHost::new();
	let destroyed = Rc::new(RefCell::new(Vec::new()));
	let module = {
		let destroyed = Rc::clone(&destroyed);
		Module::new("destroy-log").on_destroy(move |node: &TreeNode<MockNode>| {
			assert!(node.host().unwrap().parent().is_some());
			destroyed.borrow_mut().push(node.text_content().unwrap().to_owned());
		})
	};
	let patcher = init(vec![module], host.clone());
	let (body, tree) = mount(&patcher, list(&["a", "b", "c"]));
	let b = hosts(&tree)[1].clone();

	patcher.patch(tree, list(&["a", "c"])).unwrap();

	assert_eq!(*destroyed.borrow(), ["b"]);
	assert_eq!(host.removed(), [b.id()]);
	assert!(b.parent().is_none());
	assert_eq!(body.render(), "<body><div><li>a</li><li>c</li></div></body>");
}

#[test]
fn duplicate_old_keys_resolve_to_the_last_occurrence() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let (body, tree) = mount(
		&patcher,
		TreeNode::element("div").with_children(vec![
			TreeNode::element("p").with_key(7),
			TreeNode::element("li").with_key(1).with_text("first"),
			TreeNode::element("li").with_key(1).with_text("second"),
			TreeNode::element("p").with_key(8),
		]),
	);
	let second = hosts(&tree)[2].clone();

	let tree = patcher
		.patch(
			tree,
			TreeNode::element("div").with_children(vec![TreeNode::element("li").with_key(1).with_text("again"), TreeNode::element("p").with_key(9)]),
		)
		.unwrap();

	assert_eq!(hosts(&tree)[0], second);
	assert_eq!(host.removed().len(), 3);
	assert_eq!(body.render(), "<body><div><li>again</li><p></p></div></body>");
}

#[test]
fn reused_key_with_a_new_selector_is_created_fresh() {
	init_logging();
	let host = MockHost::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	let module = {
		let (created, updated, destroyed) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
		Module::new("log")
			.on_create(move |_: &TreeNode<MockNode>, node: &TreeNode<MockNode>| created.borrow_mut().push(format!("create {}", node.selector.as_deref().unwrap())))
			.on_update(move |_: &TreeNode<MockNode>, node: &TreeNode<MockNode>| updated.borrow_mut().push(format!("update {}", node.selector.as_deref().unwrap())))
			.on_destroy(move |node: &TreeNode<MockNode>| destroyed.borrow_mut().push(format!("destroy {}", node.selector.as_deref().unwrap())))
	};
	let patcher = init(vec![module], host.clone());
	let (_, tree) = mount(
		&patcher,
		TreeNode::element("div").with_children(vec![TreeNode::element("p").with_key(7), TreeNode::element("li").with_key(1), TreeNode::element("p").with_key(8)]),
	);
	let li = hosts(&tree)[1].clone();
	log.borrow_mut().clear();

	let tree = patcher
		.patch(tree, TreeNode::element("div").with_children(vec![TreeNode::element("div").with_key(1), TreeNode::element("p").with_key(9)]))
		.unwrap();

	// The stale `<li>` is only torn down with the remaining old nodes, after everything new was created.
	assert_eq!(*log.borrow(), ["update div", "create div", "create p", "destroy p", "destroy li", "destroy p"]);
	assert_ne!(hosts(&tree)[0], li);
	assert!(host.removed().contains(&li.id()));
	assert!(li.parent().is_none());
}

#[test]
fn unkeyed_children_are_patched_in_place() {
	init_logging();
	let host = MockHost::new();
	let patcher = init([], host.clone());
	let paragraphs = |texts: &[&str]| TreeNode::element("div").with_children(texts.iter().map(|&text| TreeNode::element("p").with_text(text)));
	let (body, tree) = mount(&patcher, paragraphs(&["a", "b"]));
	let before = hosts(&tree);

	let tree = patcher.patch(tree, paragraphs(&["a", "c", "d"])).unwrap();

	assert_eq!(hosts(&tree)[..2], before[..]);
	assert!(host.removed().is_empty());
	assert!(host.ops().contains(&Op::SetText { node: before[1].id(), text: "c".to_owned() }));
	assert_eq!(body.render(), "<body><div><p>a</p><p>c</p><p>d</p></div></body>");
}

#[test]
fn insert_hooks_fire_for_nodes_added_between_moved_ones() {
	init_logging();
	let inserted = Rc::new(Cell::new(0));
	let patcher = init([], MockHost::new());
	let (_, tree) = mount(&patcher, list(&["a", "b"]));

	let counter = Rc::clone(&inserted);
	let fresh = TreeNode::element("li").with_key("x").with_hooks(Hooks::new().on_insert(move |node: &TreeNode<MockNode>| {
		assert!(node.host().unwrap().parent().is_some());
		counter.set(counter.get() + 1);
	}));
	let tree = patcher
		.patch(tree, TreeNode::element("div").with_children(vec![item("b"), fresh, item("a")]))
		.unwrap();

	assert_eq!(inserted.get(), 1);
	assert_eq!(tree.children().unwrap().len(), 3);
}

#[test]
fn key_lookup_ignores_the_tag_override() {
	init_logging();
	let host = MockHost::new();
	let prepatched = Rc::new(Cell::new(0));
	let patcher = init([], host.clone());
	let (body, tree) = mount(
		&patcher,
		TreeNode::element("div").with_children(vec![
			TreeNode::element("p").with_key(7),
			TreeNode::element("li").with_key(1).with_tag_override("x-old").with_text("old"),
			TreeNode::element("p").with_key(8),
		]),
	);
	let li = hosts(&tree)[1].clone();

	let counter = Rc::clone(&prepatched);
	let renamed = TreeNode::element("li")
		.with_key(1)
		.with_tag_override("x-new")
		.with_hooks(Hooks::new().on_prepatch(move |_: &TreeNode<MockNode>, _: &TreeNode<MockNode>| counter.set(counter.get() + 1)))
		.with_text("new");
	let tree = patcher
		.patch(tree, TreeNode::element("div").with_children(vec![renamed, TreeNode::element("p").with_key(9)]))
		.unwrap();

	// Only the key and selector are compared on this path, so the `<li>` is patched and moved instead of replaced.
	assert_eq!(prepatched.get(), 1);
	assert_eq!(hosts(&tree)[0], li);
	assert_eq!(host.created(), 1);
	assert_eq!(host.removed().len(), 2);
	assert_eq!(body.render(), "<body><div><li>new</li><p></p></div></body>");
}
