use thiserror::Error;

/// Errors raised while materializing a representation through the
/// conversion graph.
#[derive(Debug, Clone, Error)]
pub enum ConverterError {
    /// No converter sequence leads from any valid source to the target.
    #[error("no conversion route in family '{family}': {from} -> {to}")]
    NoRoute {
        family: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// The data object holds no valid representation and no factory is
    /// registered for its family.
    #[error("no valid source representation in family '{family}' while materializing '{target}' and no factory registered")]
    NoValidSource {
        family: &'static str,
        target: &'static str,
    },

    /// A converter was fed a source representation it cannot read.
    #[error("converter expected source '{expected}', got '{found}'")]
    SourceMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An in-place update hit a destination whose shape or format does not
    /// match the source.
    #[error("update target incompatible: {reason}")]
    ShapeMismatch { reason: String },

    /// I/O failure while loading a disk-backed representation.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Registration conflicts in the factory and converter registries.
///
/// These are module-load-time logic errors, not data-flow errors: callers
/// register once at load and unregister at unload.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A factory object with this representation id is already registered.
    #[error("factory object for '{id}' already registered in family '{family}'")]
    DuplicateFactoryObject {
        family: &'static str,
        id: &'static str,
    },

    /// The family already has a registered representation factory.
    #[error("representation factory for family '{family}' already registered")]
    DuplicateFamilyFactory { family: &'static str },

    /// A converter for this (source, target) edge is already registered.
    #[error("converter {from} -> {to} already registered in family '{family}'")]
    DuplicateConverter {
        family: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// A converter or representation was registered into the wrong family.
    #[error("family mismatch: expected '{expected}', got '{found}'")]
    FamilyMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The factory's default object cannot be unregistered.
    #[error("cannot unregister the default factory object '{id}'")]
    DefaultObjectProtected { id: &'static str },

    /// Unregistration referenced an id with no registered factory object.
    #[error("no factory object '{id}' registered in family '{family}'")]
    UnknownFactoryObject {
        family: &'static str,
        id: &'static str,
    },
}

/// Construction and maintenance errors on a data object.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// The supplied representation belongs to a different family.
    #[error("representation family mismatch: expected '{expected}', got '{found}'")]
    FamilyMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The supplied representation's element format differs from the
    /// owner's format metadata.
    #[error("representation format mismatch: owner is {expected}, representation is {found}")]
    FormatMismatch { expected: String, found: String },

    /// The referenced representation is not present in this data object.
    #[error("no representation '{id}' in this data object")]
    UnknownRepresentation { id: &'static str },
}
