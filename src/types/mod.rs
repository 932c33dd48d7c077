// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Image references, digests, platforms, and phantom-typed layer ids.

mod digest;
mod id;
mod image_ref;
mod platform;

pub use digest::{Digest, ParseDigestError};
pub use id::{Id, LayerId};
pub use image_ref::{DEFAULT_DOMAIN, ImageRef, ParseImageRefError};
pub use platform::{ParsePlatformError, Platform};
