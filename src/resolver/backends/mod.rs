// Resolver backends

pub mod ykdl;
pub mod youget;

use std::sync::Arc;

pub use ykdl::YkdlBackend;
pub use youget::YouGetBackend;

use super::models::ResolverKind;
use super::traits::ResolverBackend;

/// Build the backend for `kind`, using `program` when configured
pub fn backend_for(
    kind: ResolverKind,
    program: Option<String>,
    preferred_stream: Option<String>,
) -> Arc<dyn ResolverBackend> {
    match kind {
        ResolverKind::Ykdl => {
            let backend = match program {
                Some(path) => YkdlBackend::with_path(path),
                None => YkdlBackend::new(),
            };
            Arc::new(backend.with_preferred_stream(preferred_stream))
        }
        ResolverKind::YouGet => {
            let backend = match program {
                Some(path) => YouGetBackend::with_path(path),
                None => YouGetBackend::new(),
            };
            Arc::new(backend.with_preferred_stream(preferred_stream))
        }
    }
}
