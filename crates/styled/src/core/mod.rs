//! Registry core: marker codec, rule targets, grouped tag, rehydration and
//! the [`StyleSheet`] that ties them together.

pub mod marker;
pub mod mutex_ext;
pub mod rehydrate;
pub mod sheet;
pub mod tag;
pub mod target;

pub use marker::{Marker, MarkerCodec};
pub use rehydrate::{RehydratedGroup, Rehydration, rehydrate};
pub use sheet::StyleSheet;
pub use tag::{GroupSlot, GroupedTag};
pub use target::{HostTarget, RuleTarget, VirtualTarget};
