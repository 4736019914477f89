pub mod modification;
pub mod provider_kind;

pub use modification::{Modification, ModificationKind};
pub use provider_kind::ProviderKind;
