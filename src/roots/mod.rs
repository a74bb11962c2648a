// Tue Jan 13 2026 - Alex

pub mod enumerator;
pub mod handles;
pub mod path;
pub mod reachability;

pub use enumerator::{Root, RootEnumerator, RootSet, RootSource};
pub use handles::DependentHandleMap;
pub use path::{find_root_path, RootPath};
pub use reachability::{LiveSet, Reachability};
