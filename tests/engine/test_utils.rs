//! Shared test fixtures: a stub "field" family with counting converters.
//!
//! The field family plays the role of an externally loaded module's
//! representation set: a RAM encoding (the factory default), a staging
//! encoding, and a texture encoding standing in for a GPU-resident type.
//! Converters count their invocations so tests can assert exactly when the
//! engine converts, updates or short-circuits.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use multirep::repr::{downcast, downcast_mut};
use multirep::{
    ConverterError, DataFormat, DataObject, DataRuntime, FactoryObject, Family, FamilyId,
    NumericType, Representation, RepresentationConverter, RepresentationFactory, ReprId,
    TypedRepr,
};

pub const FIELD_FORMAT: DataFormat = DataFormat::new(NumericType::Uint8, 1);

// =============================================================================
// Field family
// =============================================================================

/// Stub family; metadata is the element count.
pub struct Field;

impl Family for Field {
    const NAME: &'static str = "field";
    type Meta = usize;

    fn format(_meta: &usize) -> DataFormat {
        FIELD_FORMAT
    }
}

/// Common payload access for field representations.
pub trait FieldRepr: TypedRepr<Family = Field> {
    fn from_data(data: Vec<u8>) -> Self;
    fn data(&self) -> &[u8];
    fn data_mut(&mut self) -> &mut Vec<u8>;
}

macro_rules! field_repr {
    ($ty:ident, $name:literal) => {
        #[derive(Debug)]
        pub struct $ty {
            pub data: Vec<u8>,
        }

        impl Representation for $ty {
            fn family(&self) -> FamilyId {
                Field::family_id()
            }
            fn repr_id(&self) -> ReprId {
                ReprId::of::<Self>()
            }
            fn format(&self) -> DataFormat {
                FIELD_FORMAT
            }
            fn clone_repr(&self) -> Box<dyn Representation> {
                Box::new($ty {
                    data: self.data.clone(),
                })
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        impl TypedRepr for $ty {
            type Family = Field;
            const NAME: &'static str = $name;
        }

        impl FieldRepr for $ty {
            fn from_data(data: Vec<u8>) -> Self {
                Self { data }
            }
            fn data(&self) -> &[u8] {
                &self.data
            }
            fn data_mut(&mut self) -> &mut Vec<u8> {
                &mut self.data
            }
        }
    };
}

field_repr!(FieldRam, "field-ram");
field_repr!(FieldStage, "field-stage");
field_repr!(FieldTexture, "field-texture");

// =============================================================================
// Converters
// =============================================================================

/// Copying converter that counts `create_from` and `update` invocations.
pub struct CountingConverter<S, T> {
    creates: AtomicUsize,
    updates: AtomicUsize,
    _marker: PhantomData<fn(S) -> T>,
}

impl<S: FieldRepr, T: FieldRepr> CountingConverter<S, T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            _marker: PhantomData,
        })
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl<S: FieldRepr, T: FieldRepr> RepresentationConverter for CountingConverter<S, T> {
    fn family(&self) -> FamilyId {
        Field::family_id()
    }

    fn source_id(&self) -> ReprId {
        ReprId::of::<S>()
    }

    fn target_id(&self) -> ReprId {
        ReprId::of::<T>()
    }

    fn create_from(
        &self,
        src: &dyn Representation,
    ) -> Result<Box<dyn Representation>, ConverterError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let src = downcast::<S>(src)?;
        Ok(Box::new(T::from_data(src.data().to_vec())))
    }

    fn update(
        &self,
        src: &dyn Representation,
        dst: &mut dyn Representation,
    ) -> Result<(), ConverterError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let src = downcast::<S>(src)?;
        let payload = src.data().to_vec();
        let dst = downcast_mut::<T>(dst)?;
        let buffer = dst.data_mut();
        buffer.clear();
        buffer.extend_from_slice(&payload);
        Ok(())
    }
}

/// Converter whose executions always fail, for transactionality tests.
pub struct FailingConverter<S, T> {
    _marker: PhantomData<fn(S) -> T>,
}

impl<S: FieldRepr, T: FieldRepr> FailingConverter<S, T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            _marker: PhantomData,
        })
    }
}

impl<S: FieldRepr, T: FieldRepr> RepresentationConverter for FailingConverter<S, T> {
    fn family(&self) -> FamilyId {
        Field::family_id()
    }

    fn source_id(&self) -> ReprId {
        ReprId::of::<S>()
    }

    fn target_id(&self) -> ReprId {
        ReprId::of::<T>()
    }

    fn create_from(
        &self,
        _src: &dyn Representation,
    ) -> Result<Box<dyn Representation>, ConverterError> {
        Err(ConverterError::ShapeMismatch {
            reason: "stub converter always fails".to_string(),
        })
    }

    fn update(
        &self,
        _src: &dyn Representation,
        _dst: &mut dyn Representation,
    ) -> Result<(), ConverterError> {
        Err(ConverterError::ShapeMismatch {
            reason: "stub converter always fails".to_string(),
        })
    }
}

// =============================================================================
// Setup helpers
// =============================================================================

/// Runtime with the field factory installed (RAM default, zero-filled).
pub fn field_runtime() -> Arc<DataRuntime> {
    let runtime = DataRuntime::new();
    runtime
        .factories()
        .register_object(Arc::new(RepresentationFactory::<Field>::new(
            FactoryObject::new::<FieldRam, _>(|len| FieldRam {
                data: vec![0; *len],
            }),
        )))
        .unwrap();
    runtime
}

/// A field dataset seeded with the given payload as its RAM representation.
pub fn field_object(runtime: &Arc<DataRuntime>, data: Vec<u8>) -> DataObject<Field> {
    DataObject::new(
        runtime.clone(),
        data.len(),
        Box::new(FieldRam { data }),
    )
    .unwrap()
}
