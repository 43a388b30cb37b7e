//! Live views over foreign values
//!
//! A view implements a host collection interface on top of a foreign value
//! without copying it. Reads and writes go straight through, elements are
//! converted to the view's element type on access, and every view reports
//! its backing value so that handing it back to foreign code returns the
//! original value.
//!
//! [`InterfaceProxy`] is the same idea for host interfaces: a foreign
//! function or object standing in for an interface implementation.

mod entry;
mod iterator;
mod list;
mod map;
mod proxy;

pub use entry::ForeignEntry;
pub use iterator::{ForeignIterable, ForeignIterator};
pub use list::ForeignList;
pub use map::ForeignMap;
pub use proxy::{InterfaceProxy, ProxyMode};
