//! Observable Containers
//!
//! Lists, maps and objects built from the reactive primitives. Each element
//! is its own observable cell, so readers only depend on the parts they
//! actually looked at. Structural changes (adding, removing or reordering
//! entries) are published through a separate atom per container.
//!
//! Containers are handles: cloning one shares the underlying storage, and
//! equality is identity.

mod list;
mod map;
mod object;
mod value;

pub use list::ObservableList;
pub use map::ObservableMap;
pub use object::ObservableObject;
pub use value::ObservableValue;
