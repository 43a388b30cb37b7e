//! Host-side object model: types, classes, values and collections

pub mod builtins;
pub mod class;
pub mod collections;
pub mod types;
pub mod value;

pub use class::{
    ClassId, ClassKind, HostClass, HostClassBuilder, HostField, HostMethod, Invocation,
    MethodBody, Visibility,
};
pub use collections::{
    HostCollection, HostIterable, HostIterator, HostList, HostMap, HostMapEntry, LinkedMap,
    ListIterator, VecList,
};
pub use types::{HostType, PrimitiveKind};
pub use value::{HostArray, HostObject, HostValue};
