//! The packed `tag#id.class.class` selector micro-syntax.

/// A parsed element selector.
///
/// The tag is everything before the first `#` or the first `.` at-or-after that `#` (whichever comes first).
/// A selector that starts with a marker therefore has an empty tag, which is passed on to the host unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	tag: String,
	id: Option<String>,
	class: Option<String>,
}

impl Selector {
	#[must_use]
	pub fn parse(selector: &str) -> Self {
		let hash = selector.find('#');
		let dot = selector[hash.unwrap_or(0)..].find('.').map(|dot| dot + hash.unwrap_or(0));

		let id_end = dot.unwrap_or_else(|| selector.len());
		let tag_end = hash.unwrap_or(id_end).min(id_end);

		Self {
			tag: selector[..tag_end].to_owned(),
			id: hash.filter(|&hash| hash < id_end).map(|hash| selector[hash + 1..id_end].to_owned()),
			class: dot.map(|dot| selector[dot + 1..].replace('.', " ")),
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	/// The literal classes as a `class` attribute value (space-separated).
	#[must_use]
	pub fn class(&self) -> Option<&str> {
		self.class.as_deref()
	}

	pub fn classes(&self) -> impl Iterator<Item = &str> {
		self.class.iter().flat_map(|class| class.split(' ')).filter(|class| !class.is_empty())
	}
}

impl From<&str> for Selector {
	fn from(selector: &str) -> Self {
		Self::parse(selector)
	}
}
