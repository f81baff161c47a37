//! Flash storage abstractions
//!
//! Raw flash access uses the `embedded-storage` NOR flash traits, which
//! chip HALs already implement. The wear-leveled layout on top lives in
//! `dlnio-core`.

pub use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
