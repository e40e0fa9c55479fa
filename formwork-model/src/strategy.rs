//! Per-category runtime behaviour.
//!
//! Each property's category is resolved once, at compile time, into a
//! [`Strategy`]. The operation engine only ever consults these tags.

use crate::property::PropertyDefinition;
use crate::rules::Category;

/// Whether caller input is admitted at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitPolicy {
    Never,
    Always,
    /// Admitted only if the `shouldInit` gate passes.
    Gated,
}

/// What fills the property when no input was admitted at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fallback {
    Constant,
    Default,
    /// The property must be supplied.
    Required,
    Nothing,
}

/// Whether caller input is admitted on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdatePolicy {
    Never,
    Open,
    /// Admitted only while the stored value still equals the default.
    WhileDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Strategy {
    pub(crate) init: InitPolicy,
    pub(crate) fallback: Fallback,
    pub(crate) update: UpdatePolicy,
}

impl Strategy {
    pub(crate) fn of(category: Category, definition: &PropertyDefinition) -> Self {
        let gated_init = if definition.should_init.is_some() {
            InitPolicy::Gated
        } else {
            InitPolicy::Always
        };
        let has_default = definition.default.is_some();

        let (init, fallback, update) = match category {
            Category::Constant => (InitPolicy::Never, Fallback::Constant, UpdatePolicy::Never),
            Category::Dependent => (InitPolicy::Never, Fallback::Default, UpdatePolicy::Never),
            Category::Virtual => (gated_init, Fallback::Nothing, UpdatePolicy::Open),
            Category::Lax => (
                gated_init,
                if has_default { Fallback::Default } else { Fallback::Nothing },
                UpdatePolicy::Open,
            ),
            Category::Readonly => (
                gated_init,
                if has_default { Fallback::Default } else { Fallback::Required },
                if definition.should_init.is_some() {
                    UpdatePolicy::WhileDefault
                } else {
                    UpdatePolicy::Never
                },
            ),
            Category::ReadonlyLax => (InitPolicy::Always, Fallback::Default, UpdatePolicy::WhileDefault),
            Category::Required => (InitPolicy::Always, Fallback::Required, UpdatePolicy::Open),
            Category::RequiredBy => (gated_init, Fallback::Default, UpdatePolicy::Open),
        };

        Self {
            init,
            fallback,
            update,
        }
    }
}
