use thiserror::Error;

/// Why a patch stopped partway.
///
/// Mutations applied before the failure are not rolled back.
#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + 'static> {
	#[error("host tree operation failed")]
	Host(#[from] E),

	/// The previous tree contains a node that was never materialized.
	/// This happens when a tree is submitted as "old" without having been returned by a patch.
	#[error("{0} is not bound to a host node")]
	Unbound(String),
}
